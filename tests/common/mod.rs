#![allow(dead_code)]

pub mod temp_files {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// Writes `content` to a uniquely named file in the system temp dir
    pub fn create_temp_spec(content: &str, ext: &str) -> PathBuf {
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::SeqCst);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();

        let path = std::env::temp_dir().join(format!(
            "brrtmock_test_{}_{}_{}.{}",
            std::process::id(),
            counter,
            nanos,
            ext
        ));

        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn create_temp_yaml(content: &str) -> PathBuf {
        create_temp_spec(content, "yaml")
    }

    pub fn create_temp_json(content: &str) -> PathBuf {
        create_temp_spec(content, "json")
    }

    /// Cleanup temporary files (best effort)
    pub fn cleanup_temp_files(paths: &[PathBuf]) {
        for path in paths {
            let _ = std::fs::remove_file(path);
        }
    }
}

pub mod fixtures {
    use brrtmock::{load_definition, Definition, Dispatcher, MockConfig};
    use std::path::PathBuf;
    use std::sync::Arc;

    pub fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    /// OpenAPI 3 petstore
    pub fn petstore() -> Arc<Definition> {
        Arc::new(load_definition(fixture_path("petstore.yaml")).unwrap())
    }

    /// Swagger 2 petstore
    pub fn petstore_v2() -> Arc<Definition> {
        Arc::new(load_definition(fixture_path("petstore_v2.yaml")).unwrap())
    }

    /// Dispatcher over the OpenAPI 3 petstore with validation on, rooted at `/`
    pub fn dispatcher() -> Dispatcher {
        Dispatcher::new(petstore(), MockConfig::default())
    }

    pub fn dispatcher_with(config: MockConfig) -> Dispatcher {
        Dispatcher::new(petstore(), config)
    }
}

pub mod tracing_util {
    use std::sync::Once;

    static INIT: Once = Once::new();

    /// Install a test writer subscriber once per test binary
    pub fn init_test_tracing() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("brrtmock=debug"))
                .with_test_writer()
                .try_init();
        });
    }
}
