mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use pest_advisor::cache::TieredResponseCache;
use pest_advisor::clock;
use pest_advisor::inference::InferenceClient;
use pest_advisor::provisioning::{ModelProvisioner, ModelRegistry, ModelStatus};
use pest_advisor::AdvisorConfig;

use common::{specialized, start_mock_backend, test_config, MockBackend};

const TEMPLATE: &str = "\u{feff}FROM llama3 PARAMETER temperature 0.4\r\nSYSTEM \"\"\"You advise on pest control.\"\"\"\r\n";

struct Fixture {
    backend: MockBackend,
    provisioner: ModelProvisioner,
    registry: Arc<ModelRegistry>,
    _dir: tempfile::TempDir,
}

async fn fixture(customize: impl FnOnce(&mut AdvisorConfig)) -> Fixture {
    let backend = start_mock_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&backend.url());
    config.models.specialized = vec![specialized(dir.path(), "control_methods", "pest-advisor-control", TEMPLATE)];
    customize(&mut config);

    let cache = Arc::new(TieredResponseCache::new(&config.cache, clock::system()));
    let client = Arc::new(InferenceClient::new(&config, cache, clock::system()).unwrap());
    let registry = Arc::new(ModelRegistry::from_config(&config.models));
    let provisioner = ModelProvisioner::new(client, registry.clone(), &config.models);

    Fixture { backend, provisioner, registry, _dir: dir }
}

#[tokio::test]
async fn test_missing_model_is_created_and_verified() {
    let f = fixture(|_| {}).await;

    assert!(f.provisioner.ensure_ready("control_methods").await);
    assert_eq!(f.registry.status("control_methods"), Some(ModelStatus::Ready));
    assert_eq!(f.registry.model_for("control_methods").as_deref(), Some("pest-advisor-control"));
    assert_eq!(f.backend.state.creates(), 1);

    let create = f.backend.state.last_create.lock().unwrap().clone().unwrap();
    assert_eq!(create["name"], "pest-advisor-control");
    assert_eq!(create["stream"], true);
    assert_eq!(
        create["modelfile"],
        "FROM llama3\nPARAMETER temperature 0.4\nSYSTEM \"\"\"You advise on pest control.\"\"\"\n"
    );
}

#[tokio::test]
async fn test_existing_model_is_not_recreated() {
    let f = fixture(|_| {}).await;
    f.backend.state.set_models(&["llama3:latest", "pest-advisor-control:latest"]);

    assert!(f.provisioner.ensure_ready("control_methods").await);
    assert_eq!(f.registry.status("control_methods"), Some(ModelStatus::Ready));
    assert_eq!(f.backend.state.creates(), 0);
}

#[tokio::test]
async fn test_model_that_never_appears_fails() {
    let f = fixture(|_| {}).await;
    f.backend.state.register_on_create.store(false, Ordering::SeqCst);

    assert!(!f.provisioner.ensure_ready("control_methods").await);
    assert_eq!(f.registry.status("control_methods"), Some(ModelStatus::Failed));
    assert_eq!(f.registry.model_for("control_methods"), None);
}

#[tokio::test]
async fn test_error_in_create_stream_fails() {
    let f = fixture(|_| {}).await;
    f.backend.state.register_on_create.store(false, Ordering::SeqCst);
    f.backend
        .state
        .set_create_lines(&[r#"{"status":"reading model metadata"}"#, r#"{"error":"invalid model name"}"#]);

    assert!(!f.provisioner.ensure_ready("control_methods").await);
    assert_eq!(f.registry.status("control_methods"), Some(ModelStatus::Failed));
}

#[tokio::test]
async fn test_missing_template_fails_without_create() {
    let f = fixture(|config| {
        config.models.specialized[0].template = "/nonexistent/control.modelfile".to_string();
    })
    .await;

    assert!(!f.provisioner.ensure_ready("control_methods").await);
    assert_eq!(f.registry.status("control_methods"), Some(ModelStatus::Failed));
    assert_eq!(f.backend.state.creates(), 0);
}

#[tokio::test]
async fn test_manual_retry_recovers_failed_model() {
    let f = fixture(|_| {}).await;
    f.backend.state.register_on_create.store(false, Ordering::SeqCst);
    assert!(!f.provisioner.ensure_ready("control_methods").await);

    f.backend.state.register_on_create.store(true, Ordering::SeqCst);
    assert_eq!(f.provisioner.retry("control_methods").await, Some(ModelStatus::Ready));
    assert_eq!(f.backend.state.creates(), 2);
}

#[tokio::test]
async fn test_retry_unknown_query_type() {
    let f = fixture(|_| {}).await;
    assert_eq!(f.provisioner.retry("weather").await, None);
}

#[tokio::test]
async fn test_one_failure_does_not_block_others() {
    let dir = tempfile::tempdir().unwrap();
    let f = fixture(|config| {
        config.models.specialized.push(common::specialized(
            dir.path(),
            "general",
            "pest-advisor-general",
            "FROM llama3\n",
        ));
        config.models.specialized[0].template = "/nonexistent/control.modelfile".to_string();
    })
    .await;

    assert_eq!(f.provisioner.provision_all().await, 1);
    assert_eq!(f.registry.status("control_methods"), Some(ModelStatus::Failed));
    assert_eq!(f.registry.status("general"), Some(ModelStatus::Ready));
}
