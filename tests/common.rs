use std::path::PathBuf;
use std::sync::Once;

use small_record_db::{Engine, EngineConfig};
use tempfile::TempDir;

static INIT: Once = Once::new();

pub fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// A fresh engine rooted in its own temp directory, which must stay
/// alive for as long as the engine is in use.
pub struct TempEngine {
    pub engine: Engine,
    pub data_path: PathBuf,
    _dir: TempDir,
}

pub fn new_engine() -> TempEngine {
    setup();
    let dir = TempDir::new().unwrap();
    let data_path = dir.path().join("data.db");
    let engine = Engine::open_with_config(EngineConfig::new(&data_path)).unwrap();
    TempEngine {
        engine,
        data_path,
        _dir: dir,
    }
}

pub fn insert_all(engine: &Engine, payloads: &[&str]) {
    for p in payloads {
        engine.insert_record(p.as_bytes()).unwrap();
    }
}

pub fn read_str(engine: &Engine, record_id: i64) -> String {
    String::from_utf8(engine.read_record(record_id).unwrap()).unwrap()
}
