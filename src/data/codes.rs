//! Human-readable names for the small integer codes used in the clickstream.

use std::ops::RangeInclusive;

const COUNTRIES: [&str; 47] = [
    "Australia",
    "Austria",
    "Belgium",
    "British Virgin Islands",
    "Cayman Islands",
    "Christmas Island",
    "Croatia",
    "Cyprus",
    "Czech Republic",
    "Denmark",
    "Estonia",
    "unidentified",
    "Faroe Islands",
    "Finland",
    "France",
    "Germany",
    "Greece",
    "Hungary",
    "Iceland",
    "India",
    "Ireland",
    "Italy",
    "Latvia",
    "Lithuania",
    "Luxembourg",
    "Mexico",
    "Netherlands",
    "Norway",
    "Poland",
    "Portugal",
    "Romania",
    "Russia",
    "San Marino",
    "Slovakia",
    "Slovenia",
    "Spain",
    "Sweden",
    "Switzerland",
    "Ukraine",
    "United Arab Emirates",
    "United Kingdom",
    "USA",
    "biz (.biz)",
    "com (.com)",
    "int (.int)",
    "net (.net)",
    "org (*.org)",
];

const CATEGORIES: [&str; 4] = ["trousers", "skirts", "blouses", "sale"];

const COLOURS: [&str; 14] = [
    "beige",
    "black",
    "blue",
    "brown",
    "burgundy",
    "gray",
    "green",
    "navy blue",
    "of many colors",
    "olive",
    "pink",
    "red",
    "violet",
    "white",
];

const LOCATIONS: [&str; 6] = [
    "top left",
    "top in the middle",
    "top right",
    "bottom left",
    "bottom in the middle",
    "bottom right",
];

const PHOTOGRAPHY: [&str; 2] = ["en face", "profile"];

pub const COUNTRY_RANGE: RangeInclusive<i64> = 1..=47;
pub const CATEGORY_RANGE: RangeInclusive<i64> = 1..=4;
pub const COLOUR_RANGE: RangeInclusive<i64> = 1..=14;
pub const LOCATION_RANGE: RangeInclusive<i64> = 1..=6;
pub const PHOTOGRAPHY_RANGE: RangeInclusive<i64> = 1..=2;
/// 1 = above the category average, 2 = not.
pub const PRICE_ABOVE_AVERAGE_RANGE: RangeInclusive<i64> = 1..=2;

fn lookup(table: &[&str], code: i64) -> String {
    usize::try_from(code)
        .ok()
        .and_then(|c| c.checked_sub(1))
        .and_then(|i| table.get(i))
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("unknown ({code})"))
}

pub fn country_name(code: i64) -> String {
    lookup(&COUNTRIES, code)
}

pub fn category_name(code: i64) -> String {
    lookup(&CATEGORIES, code)
}

pub fn colour_name(code: i64) -> String {
    lookup(&COLOURS, code)
}

pub fn location_name(code: i64) -> String {
    lookup(&LOCATIONS, code)
}

pub fn photography_name(code: i64) -> String {
    lookup(&PHOTOGRAPHY, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_match_their_ranges() {
        assert_eq!(COUNTRIES.len() as i64, *COUNTRY_RANGE.end());
        assert_eq!(CATEGORIES.len() as i64, *CATEGORY_RANGE.end());
        assert_eq!(COLOURS.len() as i64, *COLOUR_RANGE.end());
        assert_eq!(LOCATIONS.len() as i64, *LOCATION_RANGE.end());
        assert_eq!(PHOTOGRAPHY.len() as i64, *PHOTOGRAPHY_RANGE.end());
    }

    #[test]
    fn names_are_one_based() {
        assert_eq!(country_name(1), "Australia");
        assert_eq!(country_name(29), "Poland");
        assert_eq!(category_name(4), "sale");
        assert_eq!(colour_name(2), "black");
        assert_eq!(location_name(6), "bottom right");
        assert_eq!(photography_name(2), "profile");
    }

    #[test]
    fn unknown_codes_are_labelled() {
        assert_eq!(colour_name(0), "unknown (0)");
        assert_eq!(colour_name(15), "unknown (15)");
        assert_eq!(country_name(-3), "unknown (-3)");
    }
}
