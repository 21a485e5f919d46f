use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PreferenceQuestion {
    /// Key in the preferences object
    pub field: &'static str,
    pub question: &'static str,
}

/// Asked in this order.
pub const PREFERENCE_QUESTIONS: &[PreferenceQuestion] = &[
    PreferenceQuestion {
        field: "data_sharing",
        question: "Do you want websites or apps to be allowed to share your personal data with third parties?",
    },
    PreferenceQuestion {
        field: "location_tracking",
        question: "Do you want to allow websites to track or use your precise location?",
    },
    PreferenceQuestion {
        field: "data_retention",
        question: "Should we allow services to store your data? If so, for how many days at most?",
    },
    PreferenceQuestion {
        field: "targeted_ads",
        question: "Do you allow personalized or behavioral ads based on your browsing activity?",
    },
    PreferenceQuestion {
        field: "data_sales",
        question: "Should we flag policies that mention selling or licensing your data?",
    },
    PreferenceQuestion {
        field: "automated_decision_making",
        question: "Are you okay with companies using automated systems to make decisions about you (e.g., credit scoring, profiling)?",
    },
    PreferenceQuestion {
        field: "third_party_integrations",
        question: "Do you allow integrations with third-party services? If yes, which providers are trusted?",
    },
    PreferenceQuestion {
        field: "consent_mechanism",
        question: "Do you prefer websites to get your explicit consent before collecting data? (opt-in vs opt-out vs forced)",
    },
    PreferenceQuestion {
        field: "auto_renewal_clauses",
        question: "Should we flag subscriptions that auto-renew without notifying you?",
    },
    PreferenceQuestion {
        field: "data_portability",
        question: "Do you want websites to provide easy access for downloading your personal data?",
    },
];

/// First question whose field is missing or null. `None` once all are answered.
pub fn next_question(preferences: &Value) -> Option<&'static PreferenceQuestion> {
    PREFERENCE_QUESTIONS
        .iter()
        .find(|q| preferences.get(q.field).map_or(true, Value::is_null))
}
