use crate::criteria::SearchCriteria;

/// Keys every returned object must carry, with the type the oracle is asked for.
pub(crate) const LEAD_FIELDS: &[(&str, &str)] = &[
    ("companyName", "string"),
    ("rating", "number"),
    ("reviewCount", "number"),
    ("phoneNumber", "string (or \"N/A\" if not found)"),
    ("address", "string"),
    ("postalCode", "string"),
    ("googleMapsUrl", "string"),
];

/// Builds the natural-language instruction for one lead search.
///
/// Every criterion becomes its own numbered clause. The rating bound is
/// spelled out as exclusive and the requested quantity is echoed as given.
pub fn build_instruction(criteria: &SearchCriteria) -> String {
    let location = criteria.location.as_str();
    let threshold = format_threshold(criteria.rating_threshold);
    let radius = criteria.max_distance.as_deref()
        .map(|d| format!(" (Radius: approx {d})"))
        .unwrap_or_default();

    let mut out = String::new();
    out.push_str("You are a lead generation specialist.\n");
    out.push_str(&format!(
        "Use Google Maps to search for small businesses in or around \"{location}\".\n\n"
    ));

    out.push_str("Search and filtering criteria:\n");
    out.push_str(&format!("1. Area: within \"{location}\"{radius}.\n"));
    out.push_str("2. Target: small businesses that ideally have NO website listed.\n");
    out.push_str(&format!(
        "3. Rating: strictly BELOW {threshold} stars. A business rated exactly {threshold} does not qualify.\n"
    ));
    out.push_str(&format!("4. Reviews: At least {} reviews.\n", criteria.min_reviews));
    out.push_str(&format!(
        "5. Quantity: Try to find {} businesses that match these criteria.\n\n",
        criteria.quantity
    ));

    out.push_str(&format!(
        "If you cannot find {} businesses matching both \"no website\" and \"low rating\", \
        prioritize the rating filter first, then the website filter.\n\n",
        criteria.quantity
    ));

    out.push_str("Output format:\n");
    out.push_str("Return the results strictly as a JSON array of objects. Each object must have these exact keys:\n");
    for (key, kind) in LEAD_FIELDS {
        out.push_str(&format!("- \"{key}\": {kind}\n"));
    }
    out.push_str(
        "\nDo not include any markdown formatting such as ```json or ```, and no text before or after the array. \
        Return only the raw JSON array. Return [] if nothing matches.\n",
    );
    out
}

/// Renders the threshold with at least one decimal place (`4` -> `4.0`).
fn format_threshold(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
