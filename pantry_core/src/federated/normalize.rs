//! Raw provider items → [`CatalogItem`].
//!
//! Every provider names the same concept differently, and some vary naming
//! within their own payloads (search vs. detail shapes). Each provenance gets
//! one [`AliasTable`]: for every canonical field an ordered list of JSON
//! pointers, tried in order, first non-empty value wins. One generic routine
//! consumes the tables; adding a provider means adding a table.

use super::types::{CatalogItem, NutritionFact};
use crate::connectors::nutrition::nutrients::{self, NutrientDef};
use crate::query::Source;
use serde_json::Value;
use std::collections::HashSet;

/// Where a canonical field's value can come from.
#[derive(Debug, Clone, Copy)]
pub enum FieldSource {
    /// A single JSON pointer
    Key(&'static str),
    /// Several pointers joined with a space (`28` + `g` → `28 g`); the first must resolve
    Joined(&'static [&'static str]),
}

use FieldSource::{Joined, Key};

/// Where nutrient facts live in a raw item.
#[derive(Debug, Clone, Copy)]
pub enum NutrientLayout {
    /// `[{name, amount, unit}]` with alias pointers for each part
    Named {
        list: &'static str,
        name: &'static [&'static str],
        amount: &'static [&'static str],
        unit: &'static [&'static str],
    },
    /// `[{attr_id, value}]` resolved through a lookup table
    AttrIds {
        list: &'static str,
        id: &'static str,
        amount: &'static str,
        table: &'static [NutrientDef],
    },
    /// Flat top-level fields: (pointer, name, unit)
    Flat(&'static [(&'static str, &'static str, &'static str)]),
}

/// Alias lists for one provenance.
#[derive(Debug)]
pub struct AliasTable {
    pub provenance: Source,
    pub id: &'static [FieldSource],
    pub name: &'static [FieldSource],
    pub brand: &'static [FieldSource],
    pub manufacturer: &'static [FieldSource],
    pub gtin: &'static [FieldSource],
    pub category: &'static [FieldSource],
    pub vendor: &'static [FieldSource],
    pub serving_size: &'static [FieldSource],
    pub ingredients: &'static [FieldSource],
    pub allergens: &'static [FieldSource],
    pub nutrients: &'static [NutrientLayout],
}

static PRIMARY: AliasTable = AliasTable {
    provenance: Source::Primary,
    id: &[Key("/itemId"), Key("/id"), Key("/itemNo"), Key("/gtinNo"), Key("/gtin")],
    name: &[Key("/itemName"), Key("/name"), Key("/productName"), Key("/description")],
    brand: &[Key("/brandName"), Key("/brand")],
    manufacturer: &[Key("/manufacturerName"), Key("/manufacturer"), Key("/mfrName")],
    gtin: &[Key("/gtinNo"), Key("/gtin"), Key("/upc"), Key("/ean")],
    category: &[Key("/itemCategory"), Key("/category"), Key("/categoryName")],
    vendor: &[Key("/vendorName"), Key("/vendorname"), Key("/vendor"), Key("/supplierName")],
    serving_size: &[
        Key("/servingSize"),
        Key("/serving_size"),
        Joined(&["/servingQty", "/servingUom"]),
    ],
    ingredients: &[Key("/ingredients"), Key("/ingredientStatement"), Key("/ingredientList")],
    allergens: &[Key("/allergens"), Key("/allergenStatement"), Key("/allergenInfo")],
    nutrients: &[
        NutrientLayout::Named {
            list: "/nutritionFacts",
            name: &["/name", "/nutrientName"],
            amount: &["/value", "/amount", "/quantity"],
            unit: &["/unit", "/uom", "/unitName"],
        },
        NutrientLayout::Named {
            list: "/nutrients",
            name: &["/name", "/nutrientName"],
            amount: &["/value", "/amount"],
            unit: &["/unit", "/unitName"],
        },
    ],
};

static USDA: AliasTable = AliasTable {
    provenance: Source::Usda,
    id: &[Key("/fdcId"), Key("/fdc_id"), Key("/ndbNumber")],
    name: &[Key("/description"), Key("/lowercaseDescription")],
    brand: &[Key("/brandName"), Key("/brandOwner")],
    manufacturer: &[Key("/brandOwner"), Key("/manufacturer")],
    gtin: &[Key("/gtinUpc")],
    category: &[
        Key("/foodCategory"),
        Key("/brandedFoodCategory"),
        Key("/foodCategory/description"),
    ],
    vendor: &[Key("/marketCountry")],
    serving_size: &[
        Joined(&["/servingSize", "/servingSizeUnit"]),
        Key("/householdServingFullText"),
    ],
    ingredients: &[Key("/ingredients")],
    allergens: &[],
    nutrients: &[
        // search results
        NutrientLayout::Named {
            list: "/foodNutrients",
            name: &["/nutrientName", "/nutrient/name", "/name"],
            amount: &["/value", "/amount"],
            unit: &["/unitName", "/nutrient/unitName"],
        },
    ],
};

static UPC: AliasTable = AliasTable {
    provenance: Source::Upc,
    id: &[Key("/ean"), Key("/upc"), Key("/gtin"), Key("/asin")],
    name: &[Key("/title"), Key("/description")],
    brand: &[Key("/brand")],
    manufacturer: &[Key("/manufacturer")],
    gtin: &[Key("/gtin"), Key("/ean"), Key("/upc")],
    category: &[Key("/category")],
    vendor: &[Key("/offers/0/merchant"), Key("/offers/0/domain")],
    serving_size: &[Key("/size"), Key("/weight")],
    ingredients: &[],
    allergens: &[],
    nutrients: &[],
};

static NUTRITION: AliasTable = AliasTable {
    provenance: Source::Nutrition,
    id: &[Key("/nix_item_id"), Key("/tag_id"), Key("/food_name")],
    name: &[Key("/food_name"), Key("/nix_item_name"), Key("/brand_name_item_name")],
    brand: &[Key("/brand_name"), Key("/nix_brand_name")],
    manufacturer: &[Key("/nix_brand_name")],
    gtin: &[Key("/upc")],
    category: &[Key("/tags/item"), Key("/brand_type")],
    vendor: &[],
    serving_size: &[
        Joined(&["/serving_qty", "/serving_unit"]),
        Key("/serving_weight_grams"),
    ],
    ingredients: &[Key("/nf_ingredient_statement")],
    allergens: &[],
    nutrients: &[
        NutrientLayout::AttrIds {
            list: "/full_nutrients",
            id: "/attr_id",
            amount: "/value",
            table: nutrients::NUTRIENT_ATTRIBUTES,
        },
        NutrientLayout::Flat(&[
            ("/nf_calories", "Energy", "kcal"),
            ("/nf_protein", "Protein", "g"),
            ("/nf_total_fat", "Total Fat", "g"),
            ("/nf_saturated_fat", "Saturated Fat", "g"),
            ("/nf_total_carbohydrate", "Carbohydrate", "g"),
            ("/nf_sugars", "Sugars", "g"),
            ("/nf_dietary_fiber", "Dietary Fiber", "g"),
            ("/nf_cholesterol", "Cholesterol", "mg"),
            ("/nf_sodium", "Sodium", "mg"),
            ("/nf_potassium", "Potassium", "mg"),
        ]),
    ],
};

/// The alias table for a provenance.
pub fn table_for(source: Source) -> &'static AliasTable {
    match source {
        Source::Primary => &PRIMARY,
        Source::Usda => &USDA,
        Source::Upc => &UPC,
        Source::Nutrition => &NUTRITION,
    }
}

/// Native id placeholder for items that carry no id at all.
pub const UNIDENTIFIED: &str = "unidentified";

/// Map one raw item to the canonical model. Pure and deterministic.
pub fn normalize(raw: &Value, provenance: Source) -> CatalogItem {
    let table = table_for(provenance);
    let native = first_match(raw, table.id);
    let mut item = CatalogItem::new(
        provenance.qualify(native.as_deref().unwrap_or(UNIDENTIFIED)),
        provenance,
    );

    item.name = first_match(raw, table.name);
    item.brand = first_match(raw, table.brand);
    item.manufacturer = first_match(raw, table.manufacturer);
    item.gtin = first_match(raw, table.gtin);
    item.category = first_match(raw, table.category);
    item.vendor = first_match(raw, table.vendor);
    item.serving_size = first_match(raw, table.serving_size);
    item.ingredients = first_match(raw, table.ingredients);
    item.allergens = first_match(raw, table.allergens);
    item.nutrition = nutrition_facts(raw, table.nutrients);
    item.raw = raw.clone();
    item
}

/// Normalize a batch, keeping ids unique within it.
///
/// Items without an id get `row-<n>` (absolute row, counting from
/// `row_offset`); an id already taken in the batch gets the lowest free
/// `#<k>` suffix, k >= 2.
pub fn normalize_batch(items: &[Value], provenance: Source, row_offset: u64) -> Vec<CatalogItem> {
    let unidentified = provenance.qualify(UNIDENTIFIED);
    let mut taken: HashSet<String> = HashSet::new();

    items
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            let mut item = normalize(raw, provenance);
            if item.id == unidentified {
                item.id = provenance.qualify(&format!("row-{}", row_offset + idx as u64 + 1));
            }
            if taken.contains(&item.id) {
                let mut k = 2;
                while taken.contains(&format!("{}#{}", item.id, k)) {
                    k += 1;
                }
                item.id = format!("{}#{}", item.id, k);
            }
            taken.insert(item.id.clone());
            item
        })
        .collect()
}

fn first_match(raw: &Value, sources: &[FieldSource]) -> Option<String> {
    sources.iter().find_map(|source| resolve(raw, *source))
}

fn resolve(raw: &Value, source: FieldSource) -> Option<String> {
    match source {
        Key(pointer) => raw.pointer(pointer).and_then(text_of),
        Joined(pointers) => {
            let (head, tail) = pointers.split_first()?;
            let mut parts = vec![raw.pointer(head).and_then(text_of)?];
            parts.extend(tail.iter().filter_map(|p| raw.pointer(p).and_then(text_of)));
            Some(parts.join(" "))
        }
    }
}

/// Non-empty text for a scalar or an array of scalars.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter(|v| !v.is_array() && !v.is_object())
                .filter_map(text_of)
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

/// Amount as a number; accepts `12.5` and `"12.5"` / `"12.5 g"`.
fn amount_of(value: &Value) -> Option<(f64, Option<String>)> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| (f, None)),
        Value::String(s) => {
            let mut parts = s.split_whitespace();
            let amount = parts.next()?.parse::<f64>().ok()?;
            let unit = parts.collect::<Vec<_>>().join(" ");
            Some((amount, (!unit.is_empty()).then_some(unit)))
        }
        _ => None,
    }
}

fn nutrition_facts(raw: &Value, layouts: &[NutrientLayout]) -> Vec<NutritionFact> {
    let mut facts: Vec<NutritionFact> = Vec::new();
    let mut push = |fact: NutritionFact| {
        if !facts.iter().any(|f| f.name.eq_ignore_ascii_case(&fact.name)) {
            facts.push(fact);
        }
    };

    for layout in layouts {
        match layout {
            NutrientLayout::Named {
                list,
                name,
                amount,
                unit,
            } => {
                let Some(entries) = raw.pointer(list).and_then(Value::as_array) else {
                    continue;
                };
                for entry in entries {
                    let Some(fact_name) = name.iter().find_map(|p| entry.pointer(p).and_then(text_of)) else {
                        continue;
                    };
                    let Some((value, inline_unit)) = amount.iter().find_map(|p| entry.pointer(p).and_then(amount_of)) else {
                        continue;
                    };
                    let unit = unit
                        .iter()
                        .find_map(|p| entry.pointer(p).and_then(text_of))
                        .or(inline_unit);
                    push(NutritionFact {
                        name: fact_name,
                        amount: value,
                        unit,
                    });
                }
            }
            NutrientLayout::AttrIds {
                list,
                id,
                amount,
                table,
            } => {
                let Some(entries) = raw.pointer(list).and_then(Value::as_array) else {
                    continue;
                };
                for entry in entries {
                    let attr = entry
                        .pointer(id)
                        .and_then(Value::as_u64)
                        .and_then(|n| u32::try_from(n).ok());
                    let Some(def) = attr.and_then(|a| table.iter().find(|d| d.attr_id == a)) else {
                        continue;
                    };
                    let Some((value, _)) = entry.pointer(amount).and_then(amount_of) else {
                        continue;
                    };
                    push(NutritionFact {
                        name: def.name.to_string(),
                        amount: value,
                        unit: Some(def.unit.to_string()),
                    });
                }
            }
            NutrientLayout::Flat(fields) => {
                for (pointer, fact_name, fact_unit) in fields.iter() {
                    if let Some((value, _)) = raw.pointer(pointer).and_then(amount_of) {
                        push(NutritionFact {
                            name: fact_name.to_string(),
                            amount: value,
                            unit: Some(fact_unit.to_string()),
                        });
                    }
                }
            }
        }
    }
    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_primary_item() {
        let raw = json!({
            "itemId": "A-100",
            "itemName": "Organic Quinoa",
            "brandName": "Andean Gold",
            "manufacturerName": "",
            "manufacturer": "Andean Foods Ltd",
            "gtinNo": "00812345000012",
            "itemCategory": "Grains",
            "vendorname": "North Co-op",
            "allergens": ["gluten-free facility", "may contain sesame"],
            "nutritionFacts": [
                {"name": "Protein", "value": 8.1, "unit": "g"},
                {"name": "Energy", "value": "222 kcal"}
            ]
        });
        let item = normalize(&raw, Source::Primary);
        assert_eq!(item.id, "primary:A-100");
        assert_eq!(item.name.as_deref(), Some("Organic Quinoa"));
        assert_eq!(item.brand.as_deref(), Some("Andean Gold"));
        // blank alias is skipped, next alias wins
        assert_eq!(item.manufacturer.as_deref(), Some("Andean Foods Ltd"));
        assert_eq!(item.gtin.as_deref(), Some("00812345000012"));
        assert_eq!(item.vendor.as_deref(), Some("North Co-op"));
        assert_eq!(
            item.allergens.as_deref(),
            Some("gluten-free facility, may contain sesame")
        );
        assert_eq!(item.nutrition.len(), 2);
        assert_eq!(item.nutrition[1].amount, 222.0);
        assert_eq!(item.nutrition[1].unit.as_deref(), Some("kcal"));
        assert!(item.serving_size.is_none());
        assert_eq!(item.provenance, Source::Primary);
    }

    #[test]
    fn test_normalize_usda_search_and_detail_shapes() {
        let search = json!({
            "fdcId": 2345678,
            "description": "QUINOA, WHITE",
            "brandOwner": "Bob's Red Mill",
            "gtinUpc": "039978005335",
            "brandedFoodCategory": "Rice",
            "servingSize": 45,
            "servingSizeUnit": "g",
            "foodNutrients": [
                {"nutrientName": "Protein", "value": 6, "unitName": "G"}
            ]
        });
        let item = normalize(&search, Source::Usda);
        assert_eq!(item.id, "usda:2345678");
        assert_eq!(item.brand.as_deref(), Some("Bob's Red Mill"));
        assert_eq!(item.manufacturer.as_deref(), Some("Bob's Red Mill"));
        assert_eq!(item.category.as_deref(), Some("Rice"));
        assert_eq!(item.serving_size.as_deref(), Some("45 g"));
        assert_eq!(item.nutrition[0].unit.as_deref(), Some("G"));

        let detail = json!({
            "fdcId": 2345678,
            "description": "QUINOA, WHITE",
            "foodCategory": {"description": "Grains"},
            "householdServingFullText": "1/4 cup",
            "foodNutrients": [
                {"nutrient": {"name": "Energy", "unitName": "kcal"}, "amount": 170}
            ]
        });
        let item = normalize(&detail, Source::Usda);
        assert_eq!(item.category.as_deref(), Some("Grains"));
        assert_eq!(item.serving_size.as_deref(), Some("1/4 cup"));
        assert_eq!(item.nutrition[0].name, "Energy");
        assert_eq!(item.nutrition[0].amount, 170.0);
    }

    #[test]
    fn test_normalize_upc_nested_vendor() {
        let raw = json!({
            "ean": "0012345678905",
            "title": "Sparkling Water 12pk",
            "brand": "Fizz",
            "upc": "012345678905",
            "category": "Food > Beverages",
            "images": ["https://img/1.jpg"],
            "offers": [{"merchant": "Grocer A", "price": 4.99}, {"merchant": "Grocer B"}]
        });
        let item = normalize(&raw, Source::Upc);
        assert_eq!(item.id, "upc:0012345678905");
        assert_eq!(item.vendor.as_deref(), Some("Grocer A"));
        assert!(item.nutrition.is_empty());
    }

    #[test]
    fn test_normalize_nutrition_attr_ids() {
        let raw = json!({
            "food_name": "Greek Yogurt",
            "brand_name": "Dairy Hill",
            "nix_item_id": "5a1b",
            "serving_qty": 1,
            "serving_unit": "cup",
            "nf_calories": 150,
            "full_nutrients": [
                {"attr_id": 203, "value": 15.2},
                {"attr_id": 208, "value": 149.5},
                {"attr_id": 99999, "value": 1}
            ]
        });
        let item = normalize(&raw, Source::Nutrition);
        assert_eq!(item.id, "nutrition:5a1b");
        assert_eq!(item.serving_size.as_deref(), Some("1 cup"));
        let energy: Vec<_> = item.nutrition.iter().filter(|f| f.name == "Energy").collect();
        // attr-id list wins over the flat field for the same nutrient
        assert_eq!(energy.len(), 1);
        assert_eq!(energy[0].amount, 149.5);
        assert!(item.nutrition.iter().any(|f| f.name == "Protein" && f.unit.as_deref() == Some("g")));
        assert_eq!(item.nutrition.len(), 2);
    }

    #[test]
    fn test_unresolved_fields_stay_absent() {
        let item = normalize(&json!({"title": null, "brand": "   ", "offers": []}), Source::Upc);
        assert_eq!(item.id, "upc:unidentified");
        assert!(item.name.is_none());
        assert!(item.brand.is_none());
        assert!(item.vendor.is_none());
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let raw = json!({
            "food_name": "apple",
            "tag_id": 384,
            "serving_qty": 1,
            "serving_unit": "medium",
            "full_nutrients": [{"attr_id": 208, "value": 95}]
        });
        let first = normalize(&raw, Source::Nutrition);
        for _ in 0..10 {
            assert_eq!(normalize(&raw, Source::Nutrition), first);
        }
    }

    #[test]
    fn test_batch_ids_are_unique() {
        let items = vec![
            json!({"fdcId": 1}),
            json!({"description": "no id"}),
            json!({"fdcId": 1}),
            json!({"description": "no id either"}),
        ];
        let batch = normalize_batch(&items, Source::Usda, 20);
        let ids: Vec<_> = batch.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["usda:1", "usda:row-22", "usda:1#2", "usda:row-24"]);
    }

    #[test]
    fn test_suffixed_ids_do_not_collide_with_native_ids() {
        let items = vec![
            json!({"fdcId": 1}),
            json!({"fdcId": 1}),
            json!({"fdcId": "1#2"}),
            json!({"fdcId": 1}),
            json!({"description": "no id"}),
            json!({"fdcId": "row-5"}),
        ];
        let batch = normalize_batch(&items, Source::Usda, 0);
        let ids: Vec<_> = batch.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["usda:1", "usda:1#2", "usda:1#2#2", "usda:1#3", "usda:row-5", "usda:row-5#2"]
        );
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_every_source_has_a_table() {
        for source in Source::ALL {
            assert_eq!(table_for(source).provenance, source);
            assert!(!table_for(source).id.is_empty());
        }
    }
}
