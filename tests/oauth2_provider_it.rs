#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use identity_broker::{
	_preludet::*,
	auth::ScopeList,
	clock::FixedClock,
	dialect::{OAuth2Config, OAuth2Provider, OAuth2Session},
	http::ReqwestHttpClient,
	provider::{
		CallbackParams, GrantType, ProfileTokenPlacement, Provider, ProviderDescriptor,
		ProviderQuirks,
	},
	session::{Session, ZERO_INSTANT},
	user::ProfileFields,
};

const CLIENT_ID: &str = "client-it";
const CLIENT_SECRET: &str = "secret-it";
const NOW: i64 = 1_700_000_000;
const REJECTION: &str =
	"{\"error\":\"invalid_grant\",\"error_description\":\"code already used\",\"trace_id\":\"t-42\"}";

fn config() -> OAuth2Config {
	OAuth2Config::new(CLIENT_ID, CLIENT_SECRET, "https://app.example.com/callback")
		.expect("Client registration should build.")
		.with_scopes(ScopeList::new(["openid", "profile"]).expect("Scopes should be valid."))
}

fn build_provider(descriptor: ProviderDescriptor) -> OAuth2Provider<ReqwestHttpClient> {
	OAuth2Provider::with_http_client("nextcloud", descriptor, config(), test_reqwest_http_client())
		.with_clock(Arc::new(FixedClock::from_unix(NOW).expect("Fixed clock should build.")))
}

fn mock_provider(server: &MockServer, grants: &[GrantType]) -> OAuth2Provider<ReqwestHttpClient> {
	build_provider(mock_descriptor(&server.url(""), grants))
}

#[test]
fn begin_auth_builds_the_authorization_url() {
	let provider =
		build_provider(mock_descriptor("https://idp.example/auth", &[GrantType::AuthorizationCode]));
	let session = provider.begin_auth("test_state").expect("BeginAuth should succeed.");
	let auth_url = session.auth_url().expect("AuthURL should be populated.");
	let pairs: BTreeMap<_, _> = Url::parse(auth_url)
		.expect("AuthURL should parse.")
		.query_pairs()
		.into_owned()
		.collect();

	assert!(auth_url.contains("idp.example/auth/authorize"));
	assert_eq!(pairs.get("client_id"), Some(&CLIENT_ID.into()));
	assert_eq!(pairs.get("redirect_uri"), Some(&"https://app.example.com/callback".into()));
	assert_eq!(pairs.get("response_type"), Some(&"code".into()));
	assert_eq!(pairs.get("scope"), Some(&"openid profile".into()));
	assert_eq!(pairs.get("state"), Some(&"test_state".into()));
	assert_eq!(
		session.marshal(),
		OAuth2Session { auth_url: auth_url.to_owned(), ..Default::default() }.marshal()
	);
}

#[tokio::test]
async fn authorize_then_fetch_user_maps_the_profile() {
	let server = MockServer::start_async().await;
	let provider = mock_provider(&server, &[GrantType::AuthorizationCode]);
	let mut session = provider.begin_auth("state-1").expect("BeginAuth should succeed.");
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.body_includes("code=valid-code");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"access-success\",\"refresh_token\":\"refresh-success\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let params = CallbackParams::from_query("code=valid-code&state=state-1");

	params.verify_state("state-1").expect("State should round-trip.");

	let credential = provider
		.authorize(&mut session, &params)
		.await
		.expect("Authorization code exchange should succeed.");

	token_mock.assert_async().await;

	assert_eq!(credential, "access-success");
	assert_eq!(session.access_token, "access-success");
	assert_eq!(session.refresh_token, "refresh-success");
	assert_eq!(
		session.expires_at,
		OffsetDateTime::from_unix_timestamp(NOW + 3600).expect("Expiry should be representable.")
	);

	let profile_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo").header("authorization", "Bearer access-success");
			then.status(200).header("content-type", "application/json").body(
				"{\"sub\":\"u-42\",\"email\":\"ada@example.com\",\"name\":\"Ada Lovelace\",\"preferred_username\":\"ada\",\"team\":\"engines\"}",
			);
		})
		.await;
	let user = provider.fetch_user(&session).await.expect("FetchUser should succeed.");

	profile_mock.assert_async().await;

	assert_eq!(user.provider, "nextcloud");
	assert_eq!(user.user_id, "u-42");
	assert_eq!(user.email, "ada@example.com");
	assert_eq!(user.name, "Ada Lovelace");
	assert_eq!(user.nick_name, "ada");
	assert_eq!(user.avatar_url, "");
	assert_eq!(user.location, "");
	assert_eq!(user.access_token, "access-success");
	assert_eq!(user.refresh_token, "refresh-success");
	assert_eq!(user.expires_at, session.expires_at);
	assert_eq!(user.raw_data.get("team"), Some(&Value::from("engines")));
}

#[tokio::test]
async fn rejected_code_returns_exchange_error_and_keeps_session() {
	let server = MockServer::start_async().await;
	let provider = mock_provider(&server, &[GrantType::AuthorizationCode]);
	let mut session = provider.begin_auth("state-1").expect("BeginAuth should succeed.");
	let before = session.clone();
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.body(REJECTION);
		})
		.await;
	let err = provider
		.authorize(&mut session, &CallbackParams::new().with("code", "used-code"))
		.await
		.expect_err("Rejected codes must fail.");

	mock.assert_async().await;

	match err {
		Error::Exchange { provider, status, body } => {
			assert_eq!(provider, "nextcloud");
			assert_eq!(status, Some(400));
			assert_eq!(body, REJECTION);
		},
		other => panic!("Unexpected error: {other:?}"),
	}

	assert_eq!(session, before);
	assert_eq!(session.access_token, "");
	assert_eq!(session.expires_at, ZERO_INSTANT);
}

#[tokio::test]
async fn provider_denials_in_the_callback_skip_the_token_endpoint() {
	let server = MockServer::start_async().await;
	let provider = mock_provider(&server, &[GrantType::AuthorizationCode]);
	let mut session = provider.begin_auth("state-1").expect("BeginAuth should succeed.");
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(500);
		})
		.await;
	let err = provider
		.authorize(&mut session, &CallbackParams::from_query("error=access_denied&state=state-1"))
		.await
		.expect_err("Denied logins must fail.");

	mock.assert_calls_async(0).await;

	assert!(matches!(err, Error::Exchange { status: None, .. }));
	assert_eq!(session.access_token, "");
}

#[tokio::test]
async fn fetch_user_reports_status_and_parse_failures() {
	let server = MockServer::start_async().await;
	let provider = mock_provider(&server, &[GrantType::AuthorizationCode]);
	let session = OAuth2Session { access_token: "at-1".into(), ..Default::default() };
	let mut unavailable = server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo");
			then.status(503);
		})
		.await;
	let err = provider.fetch_user(&session).await.expect_err("503 must fail.");

	assert!(matches!(err, Error::Fetch { status: 503, .. }));
	assert_eq!(
		err.to_string(),
		"nextcloud responded with a 503 trying to fetch user information."
	);

	unavailable.delete_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo");
			then.status(200).header("content-type", "application/json").body("<html>");
		})
		.await;

	let err = provider.fetch_user(&session).await.expect_err("Malformed bodies must fail.");

	assert!(matches!(err, Error::Parse { .. }));
}

#[tokio::test]
async fn query_token_placement_and_custom_fields() {
	let server = MockServer::start_async().await;
	let descriptor = ProviderDescriptor::builder()
		.authorization_endpoint(
			Url::parse(&server.url("/authorize")).expect("Mock authorization endpoint should parse."),
		)
		.token_endpoint(Url::parse(&server.url("/token")).expect("Mock token endpoint should parse."))
		.profile_endpoint(
			Url::parse(&server.url("/api/user")).expect("Mock profile endpoint should parse."),
		)
		.support_grant(GrantType::AuthorizationCode)
		.quirks(ProviderQuirks {
			profile_token_placement: ProfileTokenPlacement::Query,
			..ProviderQuirks::default()
		})
		.build()
		.expect("Descriptor should build.");
	let fields = ProfileFields {
		user_id: "id".into(),
		nick_name: "login".into(),
		avatar_url: "avatar_url".into(),
		location: "location".into(),
		..ProfileFields::default()
	};
	let provider = OAuth2Provider::with_http_client(
		"gitea",
		descriptor,
		config().with_profile_fields(fields),
		test_reqwest_http_client(),
	);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user").query_param("access_token", "at-1");
			then.status(200).header("content-type", "application/json").body(
				"{\"id\":1234,\"login\":\"octo\",\"avatar_url\":\"https://cdn.example/a.png\",\"location\":null}",
			);
		})
		.await;
	let session = OAuth2Session { access_token: "at-1".into(), ..Default::default() };
	let user = provider.fetch_user(&session).await.expect("FetchUser should succeed.");

	mock.assert_async().await;

	assert_eq!(user.user_id, "1234");
	assert_eq!(user.nick_name, "octo");
	assert_eq!(user.avatar_url, "https://cdn.example/a.png");
	assert_eq!(user.location, "");
	assert_eq!(user.email, "");
}

#[tokio::test]
async fn refresh_keeps_the_previous_refresh_token_when_not_rotated() {
	let server = MockServer::start_async().await;
	let provider =
		mock_provider(&server, &[GrantType::AuthorizationCode, GrantType::RefreshToken]);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.body_includes("grant_type=refresh_token")
				.body_includes("refresh_token=rt-1");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"access-2\",\"token_type\":\"bearer\",\"expires_in\":60}",
			);
		})
		.await;

	assert!(provider.refresh_token_available());

	let grant = provider.refresh_token("rt-1").await.expect("Refresh should succeed.");

	mock.assert_async().await;

	assert_eq!(grant.access_token, "access-2");
	assert_eq!(grant.refresh_token.as_deref(), Some("rt-1"));
	assert_eq!(
		grant.expires_at,
		Some(OffsetDateTime::from_unix_timestamp(NOW + 60).expect("Expiry should be representable."))
	);
	assert!(!format!("{grant:?}").contains("access-2"));
}
