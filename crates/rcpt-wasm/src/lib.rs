//! WASM bindings for receipt field extraction.
//!
//! This crate provides WebAssembly bindings for use in browsers and Node.js.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use rcpt_core::{ExtractionConfig, ExtractionEngine, ExtractionResult};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Extract fields from receipt text with the default vocabularies.
///
/// Returns a flat object; fields that were not found are absent.
#[wasm_bindgen]
pub fn extract_fields(text: &str) -> Result<JsValue, JsValue> {
    let engine = ExtractionEngine::with_defaults().map_err(to_js_error)?;
    to_js(&engine.extract(text).to_json())
}

/// Normalize a raw date match to `YYYY-MM-DD`.
#[wasm_bindgen]
pub fn normalize_date(raw: &str) -> Option<String> {
    rcpt_core::fields::normalize_date(raw).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Receipt extractor class for browser use.
///
/// Compiles its rules once; reuse one instance for many receipts.
#[wasm_bindgen]
pub struct ReceiptExtractor {
    engine: ExtractionEngine,
}

#[wasm_bindgen]
impl ReceiptExtractor {
    /// Create an extractor, optionally from an `ExtractionConfig` JSON string.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<ReceiptExtractor, JsValue> {
        let config = match config_json {
            Some(json) => serde_json::from_str::<ExtractionConfig>(&json).map_err(to_js_error)?,
            None => ExtractionConfig::default(),
        };

        let engine = ExtractionEngine::new(&config).map_err(to_js_error)?;
        Ok(Self { engine })
    }

    /// Extract fields as a flat object.
    #[wasm_bindgen]
    pub fn extract(&self, text: &str) -> Result<JsValue, JsValue> {
        to_js(&self.engine.extract(text).to_json())
    }

    /// Extract fields together with the fields that failed to parse.
    #[wasm_bindgen]
    pub fn extract_with_failures(&self, text: &str) -> Result<JsValue, JsValue> {
        let result: ExtractionResult = self.engine.extract(text);
        to_js(&result)
    }

    /// Names of the rules this extractor runs, in order.
    #[wasm_bindgen]
    pub fn field_names(&self) -> js_sys::Array {
        self.engine
            .registry()
            .names()
            .map(JsValue::from_str)
            .collect()
    }
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}
