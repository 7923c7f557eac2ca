//! Simulated pipeline outputs for offline processing.

use rand::Rng;

/// Simulated bubble detection result (2–9 bubbles per page).
pub(crate) fn bubble_count() -> u32 {
    rand::rng().random_range(2..=9)
}

/// Simulated wall-clock processing time (10–39 seconds).
pub(crate) fn processing_time_seconds() -> f64 {
    rand::rng().random_range(10..=39) as f64
}

/// Simulated translated dialogue for the page at 1-based `page_number`.
pub(crate) fn translated_texts(page_number: usize) -> Vec<String> {
    vec![
        format!("Translated dialogue {page_number}A"),
        format!("Translated dialogue {page_number}B"),
        format!("Translated thought {page_number}"),
    ]
}

/// Placeholder translated image for the page at 1-based `page_number`,
/// as an inline SVG data URI.
pub(crate) fn translated_placeholder(page_number: usize) -> String {
    format!(
        "data:image/svg+xml,<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"300\" height=\"400\">\
         <rect width=\"300\" height=\"400\" fill=\"%23f5f5f5\"/>\
         <text x=\"150\" y=\"200\" text-anchor=\"middle\" font-size=\"14\">Translated page {page_number}</text>\
         </svg>"
    )
}
