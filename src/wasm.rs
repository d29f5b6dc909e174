use crate::generator::GenerateOptions;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn generate_source(project_json: &str) -> Result<String, JsValue> {
    generate_source_with_options(project_json, 2, true)
}

#[wasm_bindgen]
pub fn generate_source_with_options(
    project_json: &str,
    indent_width: usize,
    include_prefix: bool,
) -> Result<String, JsValue> {
    let options = GenerateOptions {
        indent_width,
        include_prefix,
    };
    crate::generate_from_project_json(project_json, options).map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
