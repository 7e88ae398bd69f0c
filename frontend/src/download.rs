use travelogy_tracking::export::{GEOJSON_MIME, GPX_MIME};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url, js_sys::Array};

pub const GEOJSON_FILENAME: &str = "active-trip.geojson";
pub const GPX_FILENAME: &str = "active-trip.gpx";

pub fn save_geojson(contents: &str) -> Result<(), JsValue> {
    save_text_file(GEOJSON_FILENAME, GEOJSON_MIME, contents)
}

pub fn save_gpx(contents: &str) -> Result<(), JsValue> {
    save_text_file(GPX_FILENAME, GPX_MIME, contents)
}

/// Hands an exported track document to the browser as a file download.
pub fn save_text_file(filename: &str, mime: &str, contents: &str) -> Result<(), JsValue> {
    let parts = Array::new();
    parts.push(&JsValue::from_str(contents));

    let props = BlobPropertyBag::new();
    props.set_type(mime);

    let blob = Blob::new_with_str_sequence_and_options(&parts.into(), &props)?;
    let url = Url::create_object_url_with_blob(&blob)?;

    let anchor: HtmlAnchorElement = gloo_utils::document().create_element("a")?.dyn_into()?;
    anchor.set_href(&url);
    anchor.set_download(filename);
    anchor.click();

    Url::revoke_object_url(&url)?;
    Ok(())
}
