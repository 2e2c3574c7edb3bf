//! Static fallback dataset served when the upstream backend is unavailable.
//!
//! Everything here is `const` or `static` data; nothing is written after startup.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

pub const DOUALA: &str = "Douala";
pub const YAOUNDE: &str = "Yaoundé";

/// Cities in display order
pub const VILLES: [&str; 2] = [DOUALA, YAOUNDE];

pub const COMMUNES_DOUALA: [&str; 5] = ["Douala 1", "Douala 2", "Douala 3", "Douala 4", "Douala 5"];

pub const COMMUNES_YAOUNDE: [&str; 7] = [
    "Yaoundé 1",
    "Yaoundé 2",
    "Yaoundé 3",
    "Yaoundé 4",
    "Yaoundé 5",
    "Yaoundé 6",
    "Yaoundé 7",
];

/// Lowercase substring identifying a city and its communes
struct CityEntry {
    needle: &'static str,
    communes: &'static [&'static str],
}

static CITIES: [CityEntry; 2] = [
    CityEntry {
        needle: "douala",
        communes: &COMMUNES_DOUALA,
    },
    CityEntry {
        needle: "yaound",
        communes: &COMMUNES_YAOUNDE,
    },
];

fn find_city(text: &str) -> Option<&'static CityEntry> {
    let lowered = text.to_lowercase();
    CITIES.iter().find(|city| lowered.contains(city.needle))
}

/// Communes of the city named in `ville`, empty when no city matches
pub fn communes_for(ville: &str) -> &'static [&'static str] {
    find_city(ville).map(|city| city.communes).unwrap_or(&[])
}

/// City a commune belongs to: `Douala` only when the name contains `Douala`
/// exactly as written, `Yaoundé` for anything else
pub fn ville_for_commune(commune: &str) -> &'static str {
    if commune.contains(DOUALA) {
        DOUALA
    } else {
        YAOUNDE
    }
}

/// Count breakdown serialized as a JSON object in declaration order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakdown(pub &'static [(&'static str, u32)]);

impl Serialize for Breakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, count) in self.0 {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatsGenerales {
    pub nombre_troncons: u32,
    pub total_lineaire_ml: u32,
    pub total_superficie_taudis: u32,
    pub moyenne_points_lumineux: u32,
}

/// Road segment record
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TronconVoirie {
    pub quartier: &'static str,
    pub nom: &'static str,
    pub lineaire_ml: u32,
    pub classe: &'static str,
    pub nid_poule: &'static str,
    pub points_lumineux: u32,
    pub image: &'static str,
}

/// Informal settlement area record
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuartierTaudis {
    pub nom: &'static str,
    pub superficie_m2: u32,
    pub image: &'static str,
}

/// Indicator document for one commune
#[derive(Debug, Clone, Serialize)]
pub struct Indicateurs {
    pub commune: String,
    pub ville: &'static str,
    pub stats_generales: StatsGenerales,
    pub troncons_voirie: &'static [TronconVoirie],
    pub quartiers_taudis: &'static [QuartierTaudis],
    pub analyse_classes_voirie: Breakdown,
    pub analyse_nids_poule: Breakdown,
}

const STATS_GENERALES: StatsGenerales = StatsGenerales {
    nombre_troncons: 12,
    total_lineaire_ml: 15000,
    total_superficie_taudis: 45000,
    moyenne_points_lumineux: 35,
};

static TRONCONS_VOIRIE: [TronconVoirie; 1] = [TronconVoirie {
    quartier: "Quartier A",
    nom: "Boulevard Principal",
    lineaire_ml: 2500,
    classe: "Primaire",
    nid_poule: "Oui",
    points_lumineux: 45,
    image: "",
}];

static QUARTIERS_TAUDIS: [QuartierTaudis; 1] = [QuartierTaudis {
    nom: "Quartier B",
    superficie_m2: 12500,
    image: "",
}];

const CLASSES_VOIRIE: Breakdown = Breakdown(&[("Primaire", 8), ("Secondaire", 4)]);
const NIDS_POULE: Breakdown = Breakdown(&[("Oui", 7), ("Non", 5)]);

/// Build the indicator document for `commune`; only the name and city vary
pub fn indicateurs_for(commune: &str) -> Indicateurs {
    Indicateurs {
        commune: commune.to_string(),
        ville: ville_for_commune(commune),
        stats_generales: STATS_GENERALES,
        troncons_voirie: &TRONCONS_VOIRIE,
        quartiers_taudis: &QUARTIERS_TAUDIS,
        analyse_classes_voirie: CLASSES_VOIRIE,
        analyse_nids_poule: NIDS_POULE,
    }
}

/// Health document reported while serving fallback data
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub message: &'static str,
    pub backend: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    pub fn degraded(timestamp: Option<String>) -> Self {
        Self {
            status: "degraded",
            message: "Backend indisponible, données de secours servies",
            backend: "fallback",
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_communes_case_insensitive() {
        assert_eq!(communes_for("douala"), &COMMUNES_DOUALA);
        assert_eq!(communes_for("DOUALA"), &COMMUNES_DOUALA);
        assert_eq!(communes_for("Yaoundé"), &COMMUNES_YAOUNDE);
        assert_eq!(communes_for("yaounde"), &COMMUNES_YAOUNDE);
    }

    #[test]
    fn test_communes_unknown_is_empty() {
        assert!(communes_for("unknown").is_empty());
        assert!(communes_for("").is_empty());
    }

    #[test]
    fn test_ville_for_commune() {
        assert_eq!(ville_for_commune("Douala 1"), DOUALA);
        assert_eq!(ville_for_commune("Commune de Douala 4"), DOUALA);
        assert_eq!(ville_for_commune("Yaoundé 2"), YAOUNDE);
        assert_eq!(ville_for_commune(""), YAOUNDE);
    }

    #[test]
    fn test_ville_for_commune_is_case_sensitive() {
        assert_eq!(ville_for_commune("douala 3"), YAOUNDE);
        assert_eq!(ville_for_commune("DOUALA"), YAOUNDE);
        assert_eq!(ville_for_commune("Yaoundé douala"), YAOUNDE);
    }

    #[test]
    fn test_breakdown_keeps_declaration_order() {
        let json = serde_json::to_string(&NIDS_POULE).unwrap();
        assert_eq!(json, r#"{"Oui":7,"Non":5}"#);
        let json = serde_json::to_string(&CLASSES_VOIRIE).unwrap();
        assert_eq!(json, r#"{"Primaire":8,"Secondaire":4}"#);
    }

    #[test]
    fn test_indicateurs_document_shape() {
        let value = serde_json::to_value(indicateurs_for("Douala 1")).unwrap();
        assert_eq!(value["commune"], "Douala 1");
        assert_eq!(value["ville"], "Douala");
        assert_eq!(value["stats_generales"]["nombre_troncons"], 12);
        assert_eq!(value["stats_generales"]["total_lineaire_ml"], 15000);
        assert_eq!(value["troncons_voirie"][0]["nom"], "Boulevard Principal");
        assert_eq!(value["quartiers_taudis"][0]["superficie_m2"], 12500);
        assert_eq!(value["analyse_classes_voirie"]["Primaire"], 8);
        assert_eq!(value["analyse_nids_poule"]["Non"], 5);
    }

    #[test]
    fn test_health_timestamp_optional() {
        let value = serde_json::to_value(HealthStatus::degraded(None)).unwrap();
        assert!(value.get("timestamp").is_none());
        assert_eq!(value["backend"], "fallback");
    }
}
