//! Nutrient attribute ids used in `full_nutrients` lists.
//!
//! The lookup service reports nutrients as `{attr_id, value}` pairs; the ids
//! follow the USDA nutrient numbering.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NutrientDef {
    pub attr_id: u32,
    pub name: &'static str,
    pub unit: &'static str,
}

const fn def(attr_id: u32, name: &'static str, unit: &'static str) -> NutrientDef {
    NutrientDef {
        attr_id,
        name,
        unit,
    }
}

pub static NUTRIENT_ATTRIBUTES: &[NutrientDef] = &[
    def(203, "Protein", "g"),
    def(204, "Total Fat", "g"),
    def(205, "Carbohydrate", "g"),
    def(208, "Energy", "kcal"),
    def(221, "Alcohol", "g"),
    def(255, "Water", "g"),
    def(262, "Caffeine", "mg"),
    def(269, "Sugars", "g"),
    def(291, "Dietary Fiber", "g"),
    def(301, "Calcium", "mg"),
    def(303, "Iron", "mg"),
    def(304, "Magnesium", "mg"),
    def(305, "Phosphorus", "mg"),
    def(306, "Potassium", "mg"),
    def(307, "Sodium", "mg"),
    def(309, "Zinc", "mg"),
    def(318, "Vitamin A", "IU"),
    def(324, "Vitamin D", "IU"),
    def(401, "Vitamin C", "mg"),
    def(415, "Vitamin B6", "mg"),
    def(418, "Vitamin B12", "µg"),
    def(539, "Added Sugars", "g"),
    def(601, "Cholesterol", "mg"),
    def(605, "Trans Fat", "g"),
    def(606, "Saturated Fat", "g"),
    def(645, "Monounsaturated Fat", "g"),
    def(646, "Polyunsaturated Fat", "g"),
];

pub fn lookup(attr_id: u32) -> Option<&'static NutrientDef> {
    NUTRIENT_ATTRIBUTES.iter().find(|d| d.attr_id == attr_id)
}
