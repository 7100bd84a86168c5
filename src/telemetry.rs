use lazy_static::lazy_static;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

lazy_static! {
    pub static ref PAGES_MORPHED: IntCounter =
        register_int_counter!("pagemorph_pages_morphed_total", "Number of morphed pages").unwrap();
    pub static ref OBJECTS_PADDED: IntCounter = register_int_counter!(
        "pagemorph_objects_padded_total",
        "Number of original objects padded to a target size"
    )
    .unwrap();
    pub static ref FILLER_OBJECTS: IntCounter = register_int_counter!(
        "pagemorph_filler_objects_total",
        "Number of fabricated filler objects"
    )
    .unwrap();
    pub static ref PADDING_BYTES: IntCounter = register_int_counter!(
        "pagemorph_padding_bytes_total",
        "Bytes added by padding, fillers included"
    )
    .unwrap();
    pub static ref RESAMPLE_ATTEMPTS: IntCounter = register_int_counter!(
        "pagemorph_resample_attempts_total",
        "Sampled target profiles rejected as infeasible"
    )
    .unwrap();
}

/// Current counter values in the Prometheus text format.
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        log::warn!("cannot encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
