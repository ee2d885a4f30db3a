pub mod changes;
pub mod database;
pub mod document;
pub mod entities;
pub mod error;
pub mod model;
pub mod scheduler;
pub mod validator;
pub mod xmi;

use wasm_bindgen::prelude::*;

use changes::{EntityStore, InMemoryStore};
use database::DatabaseKind;
use document::Element;
use entities::{EntityDefinition, ProjectOptions};
use error::ModelError;
use scheduler::Scheduler;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use xmi::{Dialect, ParseOptions};

/// A full compilation request: which dialect to read the document as,
/// which database the entities target, and the per-entity options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub dialect: Dialect,
    pub database: DatabaseKind,
    pub skip_user_management: bool,
    pub enforce_table_names: bool,
    pub options: ProjectOptions,
}

/// Everything a generator needs: the entity definitions, the order to
/// create them in, and which of them differ from the store's copies.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compilation {
    pub entities: BTreeMap<String, EntityDefinition>,
    pub creation_order: Vec<String>,
    pub changed: Vec<String>,
}

/// Compile a parsed XMI document into ordered entity definitions.
pub fn compile(
    document: &Element,
    config: &Config,
    store: &dyn EntityStore,
) -> Result<Compilation, ModelError> {
    let parse_options = ParseOptions {
        database: config.database,
        skip_user_management: config.skip_user_management,
        enforce_table_names: config.enforce_table_names,
    };
    let model = xmi::parse_document(document, config.dialect, &parse_options)?;
    let entities = entities::create_entities(&model, config.database, &config.options, store)?;

    // The schedule covers every class; only generated entities make it into
    // the published order (the built-in user entity is scheduled around but
    // never created).
    let creation_order: Vec<String> = Scheduler::from_model(&model)
        .schedule()?
        .into_iter()
        .filter(|name| entities.contains_key(name))
        .collect();
    let changed = changes::filter_changed(&creation_order, &entities, store);

    Ok(Compilation {
        entities,
        creation_order,
        changed,
    })
}

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Compile a JSON-encoded XMI document to entity definitions JSON.
#[wasm_bindgen(js_name = "umlToEntities")]
pub fn uml_to_entities(document: &str, config: Option<String>) -> Result<String, String> {
    let document: Element = serde_json::from_str(document).map_err(|e| e.to_string())?;
    let mut config: Config = match config.as_deref() {
        Some(raw) => serde_json::from_str(raw).map_err(|e| e.to_string())?,
        None => Config::default(),
    };
    if config.options.changelog_base.is_none() {
        config.options.changelog_base = Some(now());
    }

    let compilation =
        compile(&document, &config, &InMemoryStore::default()).map_err(|e| e.to_string())?;
    serde_json::to_string(&compilation).map_err(|e| e.to_string())
}

#[cfg(target_arch = "wasm32")]
fn now() -> chrono::NaiveDateTime {
    // No wall clock on wasm32-unknown-unknown; take the host's.
    chrono::DateTime::from_timestamp_millis(js_sys::Date::now() as i64)
        .map(|stamp| stamp.naive_utc())
        .unwrap_or_default()
}

#[cfg(not(target_arch = "wasm32"))]
fn now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}
