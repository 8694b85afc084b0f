use crate::model::device::DeviceCategory;

/// Brand and model tables backing the add/edit autocomplete. Hand-curated,
/// no persistence.
pub const BRANDS: &[&str] = &[
    "Apple",
    "Samsung",
    "Google",
    "OnePlus",
    "Xiaomi",
    "Huawei",
    "Sony",
    "LG",
    "Motorola",
    "Nokia",
    "Dell",
    "HP",
    "Lenovo",
    "Asus",
    "Acer",
    "MSI",
    "Razer",
    "Microsoft",
    "Canon",
    "Nikon",
    "Fujifilm",
    "Panasonic",
    "Olympus",
    "Bose",
    "Sennheiser",
    "Audio-Technica",
    "JBL",
    "Beats",
    "Garmin",
    "Fitbit",
    "Amazfit",
    "PlayStation",
    "Xbox",
    "Nintendo",
];

pub fn models_for_category(category: DeviceCategory) -> &'static [&'static str] {
    match category {
        DeviceCategory::Phone => &[
            "iPhone 15 Pro Max",
            "iPhone 15 Pro",
            "iPhone 15",
            "iPhone 14 Pro",
            "iPhone 14",
            "iPhone 13 Pro",
            "iPhone 13",
            "Galaxy S24 Ultra",
            "Galaxy S24+",
            "Galaxy S24",
            "Galaxy S23 Ultra",
            "Galaxy Z Fold 5",
            "Galaxy Z Flip 5",
            "Pixel 8 Pro",
            "Pixel 8",
            "Pixel 7 Pro",
            "Pixel 7",
            "OnePlus 12",
            "OnePlus 11",
            "Xiaomi 14 Pro",
            "Xiaomi 13 Ultra",
        ],
        DeviceCategory::Laptop => &[
            "MacBook Pro 16\"",
            "MacBook Pro 14\"",
            "MacBook Air 15\"",
            "MacBook Air 13\"",
            "XPS 15",
            "XPS 13",
            "Alienware m18",
            "Spectre x360",
            "Envy 15",
            "ThinkPad X1 Carbon",
            "ThinkPad T14",
            "IdeaPad 5",
            "Legion 5",
            "ROG Zephyrus G14",
            "ZenBook 14",
            "Nitro 5",
            "Swift 3",
            "Surface Laptop 5",
            "Surface Book 3",
        ],
        DeviceCategory::Tablet => &[
            "iPad Pro 12.9\"",
            "iPad Pro 11\"",
            "iPad Air",
            "iPad",
            "iPad mini",
            "Galaxy Tab S9 Ultra",
            "Galaxy Tab S9+",
            "Galaxy Tab S9",
            "Surface Pro 9",
            "Surface Go 3",
            "Pixel Tablet",
            "Fire HD 10",
        ],
        DeviceCategory::Camera => &[
            "EOS R5", "EOS R6", "EOS R7", "EOS R10", "D850", "D780", "Z9", "Z7 II", "Z6 II",
            "A7R V", "A7 IV", "A7 III", "A6600", "X-T5", "X-T4", "X-S10", "X100V", "GH6", "G9",
            "S5",
        ],
        DeviceCategory::Tv => &[
            "OLED C3", "OLED G3", "OLED B3", "QN90C", "QN85C", "A95K", "A90K", "X95K", "X90K",
            "C2", "G2", "QN90B", "A95L", "X95L",
        ],
        DeviceCategory::Headphones => &[
            "AirPods Pro 2",
            "AirPods 3",
            "AirPods Max",
            "Beats Studio Pro",
            "WH-1000XM5",
            "WH-1000XM4",
            "WF-1000XM5",
            "QC45",
            "QuietComfort Earbuds",
            "HD 800 S",
            "HD 660S",
            "Momentum 4",
            "ATH-M50x",
            "ATH-M40x",
        ],
        DeviceCategory::Smartwatch => &[
            "Apple Watch Ultra 2",
            "Apple Watch Series 9",
            "Apple Watch Series 8",
            "Apple Watch SE",
            "Galaxy Watch 6 Classic",
            "Galaxy Watch 6",
            "Galaxy Watch 5 Pro",
            "Pixel Watch 2",
            "Pixel Watch",
            "Fitbit Versa 4",
            "Fitbit Sense 2",
            "Garmin Fenix 7",
            "Garmin Forerunner 955",
            "Amazfit GTR 4",
        ],
        DeviceCategory::Gaming => &[
            "PlayStation 5",
            "PlayStation 5 Digital",
            "PlayStation 4 Pro",
            "Xbox Series X",
            "Xbox Series S",
            "Nintendo Switch OLED",
            "Nintendo Switch",
            "Nintendo Switch Lite",
            "Steam Deck 512GB",
            "Steam Deck 256GB",
            "ROG Ally",
            "Legion Go",
        ],
        DeviceCategory::Other => &[],
    }
}

/// Models whose name starts with the given prefix, case-insensitive.
pub fn models_matching(category: DeviceCategory, prefix: &str) -> Vec<&'static str> {
    let prefix = prefix.to_lowercase();
    models_for_category(category)
        .iter()
        .copied()
        .filter(|m| m.to_lowercase().starts_with(&prefix))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_except_other_has_models() {
        for category in [
            DeviceCategory::Phone,
            DeviceCategory::Laptop,
            DeviceCategory::Tablet,
            DeviceCategory::Camera,
            DeviceCategory::Tv,
            DeviceCategory::Headphones,
            DeviceCategory::Smartwatch,
            DeviceCategory::Gaming,
        ] {
            assert!(!models_for_category(category).is_empty());
        }
        assert!(models_for_category(DeviceCategory::Other).is_empty());
    }

    #[test]
    fn prefix_match_is_case_insensitive() {
        let hits = models_matching(DeviceCategory::Phone, "iphone 15");
        assert_eq!(hits, vec!["iPhone 15 Pro Max", "iPhone 15 Pro", "iPhone 15"]);
    }
}
