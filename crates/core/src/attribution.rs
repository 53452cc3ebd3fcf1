//! Marketing attribution and URL prefill.
//!
//! Three sources feed the initial form: the query string, a persisted draft
//! snapshot, and (later) live user input. [`merge_initial_draft`] is the
//! single precedence function for the first two:
//!
//! | Field group                              | Winner                          |
//! |------------------------------------------|---------------------------------|
//! | service type, vehicle, zip / city+state  | URL when present, else snapshot |
//! | utm source/medium/campaign, referral     | URL when present, else snapshot |
//! | everything else                          | snapshot, else defaults         |
//!
//! Touch points ([`AttributionTouch`]) are resolved separately. The first
//! touch is captured once per draft and never overwritten by later URLs;
//! the last touch is recomputed from the current URL at submission.

use serde::{Deserialize, Serialize};

use crate::booking::{BookingDraft, ServiceType};

/// Fallback for a missing source or referrer.
pub const DIRECT: &str = "direct";

// ---------------------------------------------------------------------------
// URL parameters
// ---------------------------------------------------------------------------

/// The query parameters the funnel understands. Blank values are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParams {
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    /// `ref`, or `code` when `ref` is missing.
    pub referral_code: Option<String>,
    pub source: Option<String>,
    pub year: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub service: Option<String>,
    pub location: Option<String>,
}

impl UrlParams {
    /// Build from decoded key/value pairs. The first occurrence of a key wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::default();
        let mut code = None;

        for (key, value) in pairs {
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "utm_source" => &mut params.utm_source,
                "utm_medium" => &mut params.utm_medium,
                "utm_campaign" => &mut params.utm_campaign,
                "ref" => &mut params.referral_code,
                "code" => &mut code,
                "source" => &mut params.source,
                "year" => &mut params.year,
                "make" => &mut params.make,
                "model" => &mut params.model,
                "service" => &mut params.service,
                "location" => &mut params.location,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.to_string());
            }
        }

        if params.referral_code.is_none() {
            params.referral_code = code;
        }
        params
    }
}

// ---------------------------------------------------------------------------
// Touch points
// ---------------------------------------------------------------------------

/// One attribution snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionTouch {
    pub utm_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    pub referrer: String,
}

impl Default for AttributionTouch {
    fn default() -> Self {
        Self {
            utm_source: DIRECT.to_string(),
            utm_medium: None,
            utm_campaign: None,
            referrer: DIRECT.to_string(),
        }
    }
}

/// Resolve a touch point from the current URL and referrer.
///
/// `utm_source` falls back to `source`, then to `"direct"`; a missing or
/// blank referrer is `"direct"`.
pub fn resolve_touch(params: &UrlParams, referrer: Option<&str>) -> AttributionTouch {
    let utm_source = params
        .utm_source
        .clone()
        .or_else(|| params.source.clone())
        .unwrap_or_else(|| DIRECT.to_string());
    let referrer = referrer
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DIRECT)
        .to_string();

    AttributionTouch {
        utm_source,
        utm_medium: params.utm_medium.clone(),
        utm_campaign: params.utm_campaign.clone(),
        referrer,
    }
}

/// Keep an existing first touch; otherwise the current touch becomes it.
pub fn first_touch_or(
    existing: Option<AttributionTouch>,
    current: &AttributionTouch,
) -> AttributionTouch {
    existing.unwrap_or_else(|| current.clone())
}

// ---------------------------------------------------------------------------
// Location prefill
// ---------------------------------------------------------------------------

/// A decoded `location` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationPrefill {
    Zip(String),
    CityState { city: String, state: Option<String> },
}

/// Decode `location`: a 5-digit ZIP, or a `city-state` slug such as
/// `colorado-springs-co`.
///
/// A slug whose last segment is not two letters is taken as a city only.
pub fn parse_location(raw: &str) -> Option<LocationPrefill> {
    let raw = raw.trim();
    if raw.len() == 5 && raw.chars().all(|c| c.is_ascii_digit()) {
        return Some(LocationPrefill::Zip(raw.to_string()));
    }

    let segments: Vec<&str> = raw
        .split(['-', '_', ' '])
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() || segments.iter().any(|s| !s.chars().all(char::is_alphabetic)) {
        return None;
    }

    let (city_segments, state) = match segments.split_last() {
        Some((last, rest))
            if !rest.is_empty() && last.len() == 2 && last.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            (rest, Some(last.to_ascii_uppercase()))
        }
        _ => (segments.as_slice(), None),
    };

    let city = city_segments
        .iter()
        .map(|s| title_case(s))
        .collect::<Vec<_>>()
        .join(" ");
    Some(LocationPrefill::CityState { city, state })
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Apply URL prefill values onto `draft`. Unrecognized `service` slugs and
/// malformed locations are ignored.
pub fn apply_url_prefill(draft: &mut BookingDraft, params: &UrlParams) {
    if let Some(service) = params.service.as_deref().and_then(ServiceType::from_url_slug) {
        draft.set_service_type(service);
    }
    if let Some(year) = &params.year {
        draft.vehicle.year = year.clone();
    }
    if let Some(make) = &params.make {
        draft.vehicle.make = make.clone();
    }
    if let Some(model) = &params.model {
        draft.vehicle.model = model.clone();
    }
    match params.location.as_deref().and_then(parse_location) {
        Some(LocationPrefill::Zip(zip)) => draft.location.zip_code = zip,
        Some(LocationPrefill::CityState { city, state }) => {
            draft.location.city = city;
            if let Some(state) = state {
                draft.location.state = state;
            }
        }
        None => {}
    }

    let attribution = &mut draft.attribution;
    if params.utm_source.is_some() {
        attribution.utm_source = params.utm_source.clone();
    }
    if params.utm_medium.is_some() {
        attribution.utm_medium = params.utm_medium.clone();
    }
    if params.utm_campaign.is_some() {
        attribution.utm_campaign = params.utm_campaign.clone();
    }
    if params.referral_code.is_some() {
        attribution.referral_code = params.referral_code.clone();
    }
}

/// Build the initial draft: a fresh persisted snapshot (if any) seeds the
/// form, then URL values are merged on top.
pub fn merge_initial_draft(persisted: Option<BookingDraft>, params: &UrlParams) -> BookingDraft {
    let mut draft = persisted.unwrap_or_default();
    apply_url_prefill(&mut draft, params);
    draft
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> UrlParams {
        UrlParams::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn scenario_prefill_from_service_and_vehicle() {
        let p = params(&[
            ("service", "windshield-repair"),
            ("year", "2020"),
            ("make", "Honda"),
            ("model", "Civic"),
        ]);
        let draft = merge_initial_draft(None, &p);
        assert_eq!(draft.service_type, Some(ServiceType::WindshieldRepair));
        assert_eq!(draft.vehicle.year, "2020");
        assert_eq!(draft.vehicle.make, "Honda");
        assert_eq!(draft.vehicle.model, "Civic");
        assert!(crate::validation::validate_vehicle_step(&draft).is_empty());
    }

    #[test]
    fn unknown_service_is_ignored() {
        let draft = merge_initial_draft(None, &params(&[("service", "tinting")]));
        assert!(draft.service_type.is_none());
    }

    #[test]
    fn url_prefill_overrides_snapshot_but_keeps_other_fields() {
        let mut stored = BookingDraft::default();
        stored.vehicle.make = "Toyota".into();
        stored.vehicle.model = "Camry".into();
        stored.contact.first_name = "Jamie".into();

        let draft = merge_initial_draft(Some(stored), &params(&[("make", "Honda")]));
        assert_eq!(draft.vehicle.make, "Honda");
        assert_eq!(draft.vehicle.model, "Camry");
        assert_eq!(draft.contact.first_name, "Jamie");
    }

    #[test]
    fn attribution_fields_take_url_values_only_when_present() {
        let mut stored = BookingDraft::default();
        stored.attribution.utm_source = Some("google".into());
        stored.attribution.utm_campaign = Some("spring".into());

        let draft = merge_initial_draft(Some(stored), &params(&[("utm_source", "facebook")]));
        assert_eq!(draft.attribution.utm_source.as_deref(), Some("facebook"));
        assert_eq!(draft.attribution.utm_campaign.as_deref(), Some("spring"));
    }

    #[test]
    fn ref_wins_over_code() {
        let p = params(&[("code", "SAVE10"), ("ref", "PARTNER")]);
        assert_eq!(p.referral_code.as_deref(), Some("PARTNER"));
        let p = params(&[("code", "SAVE10")]);
        assert_eq!(p.referral_code.as_deref(), Some("SAVE10"));
    }

    #[test]
    fn blank_params_are_absent() {
        let p = params(&[("utm_source", "  "), ("year", "")]);
        assert_eq!(p, UrlParams::default());
    }

    #[test]
    fn touch_defaults_to_direct() {
        let touch = resolve_touch(&UrlParams::default(), None);
        assert_eq!(touch.utm_source, "direct");
        assert_eq!(touch.referrer, "direct");
        assert_eq!(resolve_touch(&UrlParams::default(), Some(" ")).referrer, "direct");
    }

    #[test]
    fn touch_source_falls_back_to_source_param() {
        let touch = resolve_touch(&params(&[("source", "yelp")]), Some("https://yelp.com/"));
        assert_eq!(touch.utm_source, "yelp");
        assert_eq!(touch.referrer, "https://yelp.com/");

        let touch = resolve_touch(&params(&[("source", "yelp"), ("utm_source", "google")]), None);
        assert_eq!(touch.utm_source, "google");
    }

    #[test]
    fn resolution_is_idempotent() {
        let p = params(&[("utm_source", "google"), ("utm_medium", "cpc"), ("year", "2018")]);
        assert_eq!(resolve_touch(&p, Some("https://g.co")), resolve_touch(&p, Some("https://g.co")));
        assert_eq!(merge_initial_draft(None, &p), merge_initial_draft(None, &p));
    }

    #[test]
    fn first_touch_is_never_replaced() {
        let first = resolve_touch(&params(&[("utm_source", "google")]), None);
        let later = resolve_touch(&params(&[("utm_source", "email")]), None);
        assert_eq!(first_touch_or(Some(first.clone()), &later), first);
        assert_eq!(first_touch_or(None, &later), later);
    }

    #[test]
    fn location_zip_and_slug() {
        assert_eq!(parse_location("80202"), Some(LocationPrefill::Zip("80202".into())));
        assert_eq!(
            parse_location("colorado-springs-co"),
            Some(LocationPrefill::CityState {
                city: "Colorado Springs".into(),
                state: Some("CO".into())
            })
        );
        assert_eq!(
            parse_location("denver"),
            Some(LocationPrefill::CityState { city: "Denver".into(), state: None })
        );
        assert_eq!(parse_location("8020"), None);
        assert_eq!(parse_location(""), None);
    }

    #[test]
    fn location_slug_prefills_city_and_state() {
        let draft = merge_initial_draft(None, &params(&[("location", "fort-collins-co")]));
        assert_eq!(draft.location.city, "Fort Collins");
        assert_eq!(draft.location.state, "CO");

        let draft = merge_initial_draft(None, &params(&[("location", "80525")]));
        assert_eq!(draft.location.zip_code, "80525");
        assert!(draft.location.city.is_empty());
    }
}
