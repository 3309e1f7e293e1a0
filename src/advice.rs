use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    /// Font Awesome icon name.
    pub icon: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

const CLEAN_AIR: [Recommendation; 2] = [
    Recommendation {
        icon: "fa-person-hiking",
        title: "Outdoor Activities",
        description: "Great time for walks, sports, or picnics!",
    },
    Recommendation {
        icon: "fa-wind",
        title: "Ventilation",
        description: "Open your windows and enjoy the breeze.",
    },
];

const MODERATE_AIR: [Recommendation; 2] = [
    Recommendation {
        icon: "fa-person-walking",
        title: "Light Outdoor Activity",
        description: "Short walks are fine unless you're sensitive.",
    },
    Recommendation {
        icon: "fa-house",
        title: "Indoor Time",
        description: "Try to stay indoors during peak hours.",
    },
];

const POOR_AIR: [Recommendation; 2] = [
    Recommendation {
        icon: "fa-head-side-mask",
        title: "Wear a Mask",
        description: "Use a pollution mask outdoors.",
    },
    Recommendation {
        icon: "fa-fan",
        title: "Use Air Purifier",
        description: "Keep air clean inside your home or office.",
    },
];

/// Health advice for an AQI value.
pub fn recommendations(aqi: u32) -> &'static [Recommendation] {
    match aqi {
        0..=50 => &CLEAN_AIR,
        51..=100 => &MODERATE_AIR,
        _ => &POOR_AIR,
    }
}
