// Filter domain model - resolves raw selections into protocol parameters
use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::error::AnalyticsError;

/// Histogram granularity sent to the API. No other interval is supported.
pub const HISTOGRAM_INTERVAL: &str = "month";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeType {
    Outgoing,
    Incoming,
}

impl ExchangeType {
    pub fn protocol_value(&self) -> &'static str {
        match self {
            ExchangeType::Outgoing => "person",
            ExchangeType::Incoming => "opportunity",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Outgoing" => Some(ExchangeType::Outgoing),
            "Incoming" => Some(ExchangeType::Incoming),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Programme {
    GlobalVolunteer,
    GlobalTalent,
    GlobalTeacher,
}

impl Programme {
    pub const ALL: [Programme; 3] = [
        Programme::GlobalVolunteer,
        Programme::GlobalTalent,
        Programme::GlobalTeacher,
    ];

    pub fn protocol_id(&self) -> u8 {
        match self {
            Programme::GlobalVolunteer => 6,
            Programme::GlobalTalent => 7,
            Programme::GlobalTeacher => 8,
        }
    }

    /// Accepts both "Global Volunteer" and "GlobalVolunteer" spellings.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.replace(' ', "").as_str() {
            "GlobalVolunteer" => Some(Programme::GlobalVolunteer),
            "GlobalTalent" => Some(Programme::GlobalTalent),
            "GlobalTeacher" => Some(Programme::GlobalTeacher),
            _ => None,
        }
    }
}

/// Raw selections as collected at the HTTP boundary, before validation.
#[derive(Debug, Default)]
pub struct RawSelection<'a> {
    pub exchange_type: Option<&'a str>,
    pub programmes: Option<&'a str>,
    pub entity_id: Option<&'a str>,
    pub start_date: Option<&'a str>,
    pub end_date: Option<&'a str>,
}

/// Validated filters; immutable once resolved, created fresh per request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterSet {
    pub exchange_type: ExchangeType,
    pub programmes: BTreeSet<Programme>,
    pub entity_id: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl FilterSet {
    pub fn resolve(raw: &RawSelection) -> Result<Self, AnalyticsError> {
        let exchange_type = match raw.exchange_type {
            Some(label) => ExchangeType::from_label(label)
                .ok_or_else(|| AnalyticsError::Input(format!("unknown exchange type {label:?}")))?,
            None => return Err(AnalyticsError::Input("exchange_type is required".into())),
        };

        // An omitted programmes parameter selects every programme.
        let programmes = match raw.programmes {
            None => Programme::ALL.into_iter().collect(),
            Some(list) => {
                let mut set = BTreeSet::new();
                for label in list.split(',').map(str::trim).filter(|l| !l.is_empty()) {
                    let programme = Programme::from_label(label)
                        .ok_or_else(|| AnalyticsError::Input(format!("unknown programme {label:?}")))?;
                    set.insert(programme);
                }
                set
            }
        };

        let entity_id = raw
            .entity_id
            .unwrap_or("")
            .trim()
            .parse::<u32>()
            .map_err(|_| AnalyticsError::Input("please enter a valid numeric entity id".into()))?;

        let start_date = parse_date(raw.start_date, "start_date")?;
        // end_date >= start_date is not validated; the API answers an
        // inverted range with an empty payload.
        let end_date = parse_date(raw.end_date, "end_date")?;

        Ok(Self {
            exchange_type,
            programmes,
            entity_id,
            start_date,
            end_date,
        })
    }

    /// Protocol query parameters in the order the API documents them, with
    /// one repeated `programmes[]` entry per selected programme.
    pub fn query_params(&self, token: &str) -> Vec<(&'static str, String)> {
        let exchange = self.exchange_type.protocol_value();
        let mut params = vec![
            ("start_date", self.start_date.to_string()),
            ("end_date", self.end_date.to_string()),
            ("histogram[type]", exchange.to_string()),
            ("histogram[interval]", HISTOGRAM_INTERVAL.to_string()),
            ("exchange_type", exchange.to_string()),
            ("histogram[office_id]", self.entity_id.to_string()),
            ("access_token", token.to_string()),
        ];
        for programme in &self.programmes {
            params.push(("programmes[]", programme.protocol_id().to_string()));
        }
        params
    }
}

fn parse_date(raw: Option<&str>, field: &str) -> Result<NaiveDate, AnalyticsError> {
    raw.unwrap_or("")
        .trim()
        .parse::<NaiveDate>()
        .map_err(|_| AnalyticsError::Input(format!("{field} must be an ISO-8601 date")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_selection<'a>() -> RawSelection<'a> {
        RawSelection {
            exchange_type: Some("Outgoing"),
            programmes: Some("Global Volunteer,GlobalTalent"),
            entity_id: Some("1606"),
            start_date: Some("2024-01-01"),
            end_date: Some("2024-12-31"),
        }
    }

    #[test]
    fn exchange_type_maps_to_protocol_value() {
        assert_eq!(ExchangeType::Outgoing.protocol_value(), "person");
        assert_eq!(ExchangeType::Incoming.protocol_value(), "opportunity");
        assert_eq!(ExchangeType::from_label("Sideways"), None);
    }

    #[test]
    fn resolve_builds_filter_set() {
        let filters = FilterSet::resolve(&raw_selection()).expect("valid selection");
        assert_eq!(filters.exchange_type, ExchangeType::Outgoing);
        assert_eq!(filters.entity_id, 1606);
        assert_eq!(
            filters.programmes,
            [Programme::GlobalVolunteer, Programme::GlobalTalent]
                .into_iter()
                .collect()
        );
    }

    #[test]
    fn resolve_defaults_to_all_programmes() {
        let mut raw = raw_selection();
        raw.programmes = None;
        let filters = FilterSet::resolve(&raw).expect("valid selection");
        assert_eq!(filters.programmes, Programme::ALL.into_iter().collect());
    }

    #[test]
    fn resolve_rejects_bad_entity_id() {
        for bad in ["", "abc", "12.5"] {
            let mut raw = raw_selection();
            raw.entity_id = Some(bad);
            let err = FilterSet::resolve(&raw).expect_err("entity id must be numeric");
            assert!(matches!(err, AnalyticsError::Input(_)), "{bad:?} -> {err:?}");
        }
    }

    #[test]
    fn resolve_rejects_unknown_programme() {
        let mut raw = raw_selection();
        raw.programmes = Some("Global Volunteer,Global Mischief");
        let err = FilterSet::resolve(&raw).expect_err("unknown programme");
        assert!(matches!(err, AnalyticsError::Input(_)));
    }

    #[test]
    fn query_params_follow_protocol_order() {
        let filters = FilterSet::resolve(&raw_selection()).expect("valid selection");
        let params = filters.query_params("secret");

        let names: Vec<&str> = params.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            [
                "start_date",
                "end_date",
                "histogram[type]",
                "histogram[interval]",
                "exchange_type",
                "histogram[office_id]",
                "access_token",
                "programmes[]",
                "programmes[]",
            ]
        );

        let value = |name: &str| {
            params
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };
        assert_eq!(value("exchange_type"), "person");
        assert_eq!(value("histogram[interval]"), "month");
        assert_eq!(value("histogram[office_id]"), "1606");
        assert_eq!(value("access_token"), "secret");

        let programme_ids: Vec<&str> = params
            .iter()
            .filter(|(n, _)| *n == "programmes[]")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(programme_ids, ["6", "7"]);
    }
}
