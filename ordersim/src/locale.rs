//! Locale-aware customer geography.
//!
//! Each locale carries a fixed table of cities with their region codes and
//! a postal code pattern. Draws are uniform over the table.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::order::CustomerGeo;

/// Locale of the generated customer geography.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    /// Brazilian Portuguese; `NNNNN-NNN` CEP postal codes.
    #[default]
    PtBr,
    /// United States English; five digit ZIP codes.
    EnUs,
}

const PT_BR_CITIES: &[(&str, &str)] = &[
    ("São Paulo", "SP"),
    ("Campinas", "SP"),
    ("Santos", "SP"),
    ("Ribeirão Preto", "SP"),
    ("Rio de Janeiro", "RJ"),
    ("Niterói", "RJ"),
    ("Belo Horizonte", "MG"),
    ("Uberlândia", "MG"),
    ("Curitiba", "PR"),
    ("Londrina", "PR"),
    ("Porto Alegre", "RS"),
    ("Caxias do Sul", "RS"),
    ("Florianópolis", "SC"),
    ("Joinville", "SC"),
    ("Salvador", "BA"),
    ("Recife", "PE"),
    ("Fortaleza", "CE"),
    ("Brasília", "DF"),
    ("Goiânia", "GO"),
    ("Manaus", "AM"),
    ("Belém", "PA"),
    ("Vitória", "ES"),
    ("Natal", "RN"),
    ("Campo Grande", "MS"),
];

const EN_US_CITIES: &[(&str, &str)] = &[
    ("New York", "NY"),
    ("Buffalo", "NY"),
    ("Los Angeles", "CA"),
    ("San Diego", "CA"),
    ("Chicago", "IL"),
    ("Houston", "TX"),
    ("Austin", "TX"),
    ("Phoenix", "AZ"),
    ("Philadelphia", "PA"),
    ("Seattle", "WA"),
    ("Denver", "CO"),
    ("Boston", "MA"),
    ("Atlanta", "GA"),
    ("Miami", "FL"),
];

impl Locale {
    fn cities(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::PtBr => PT_BR_CITIES,
            Self::EnUs => EN_US_CITIES,
        }
    }

    /// Draws a customer location.
    pub fn customer_geo<R: Rng + ?Sized>(self, rng: &mut R) -> CustomerGeo {
        let (city, region) = self
            .cities()
            .choose(rng)
            .copied()
            .unwrap_or(("", ""));
        CustomerGeo {
            city: city.to_string(),
            region_code: region.to_string(),
            postal_code: self.postal_code(rng),
        }
    }

    fn postal_code<R: Rng + ?Sized>(self, rng: &mut R) -> String {
        match self {
            Self::PtBr => format!(
                "{:05}-{:03}",
                rng.random_range(1_000..100_000),
                rng.random_range(0..1_000)
            ),
            Self::EnUs => format!("{:05}", rng.random_range(501..100_000)),
        }
    }

    /// Whether `postal_code` has this locale's shape.
    pub fn is_valid_postal_code(self, postal_code: &str) -> bool {
        let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        match self {
            Self::PtBr => postal_code
                .split_once('-')
                .is_some_and(|(head, tail)| {
                    head.len() == 5 && tail.len() == 3 && digits(head) && digits(tail)
                }),
            Self::EnUs => postal_code.len() == 5 && digits(postal_code),
        }
    }

    /// Whether `region_code` belongs to this locale's table.
    pub fn knows_region(self, region_code: &str) -> bool {
        self.cities().iter().any(|(_, region)| *region == region_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generated_geography_matches_the_locale() {
        let mut rng = StdRng::seed_from_u64(11);
        for locale in [Locale::PtBr, Locale::EnUs] {
            for _ in 0..200 {
                let geo = locale.customer_geo(&mut rng);
                assert!(!geo.city.is_empty());
                assert!(locale.knows_region(&geo.region_code), "{geo:?}");
                assert!(locale.is_valid_postal_code(&geo.postal_code), "{geo:?}");
            }
        }
    }

    #[test]
    fn postal_code_shapes() {
        assert!(Locale::PtBr.is_valid_postal_code("01310-100"));
        assert!(!Locale::PtBr.is_valid_postal_code("01310100"));
        assert!(!Locale::PtBr.is_valid_postal_code("0131-0100"));
        assert!(Locale::EnUs.is_valid_postal_code("02115"));
        assert!(!Locale::EnUs.is_valid_postal_code("2115"));
    }

    #[test]
    fn locale_uses_snake_case_names() {
        assert_eq!(serde_json::to_string(&Locale::PtBr).unwrap(), "\"pt_br\"");
        assert_eq!(
            serde_json::from_str::<Locale>("\"en_us\"").unwrap(),
            Locale::EnUs
        );
    }
}
