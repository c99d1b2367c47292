//! Hand-authored fallback field sets keyed by description keywords.

/// Template families, in matching priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateCategory {
    Commerce,
    Education,
    Finance,
    Weather,
    Generic,
}

/// Static `(field name, description)` pairs.
pub type FieldPairs = &'static [(&'static str, &'static str)];

struct Template {
    category: TemplateCategory,
    keywords: &'static [&'static str],
    fields: FieldPairs,
}

const COMMERCE_FIELDS: FieldPairs = &[
    ("order_id", "Unique order identifier"),
    ("order_date", "Date of the order"),
    ("customer_id", "Reference to the customer"),
    ("product_id", "Reference to the product"),
    ("quantity", "Units ordered"),
    ("unit_price", "Price per unit"),
    ("order_total", "Computed total for the order"),
];

const EDUCATION_FIELDS: FieldPairs = &[
    ("student_id", "Unique student identifier"),
    ("name", "Student full name"),
    ("class", "Class/grade level"),
    ("subject", "Subject name"),
    ("score", "Marks/score obtained"),
    ("exam_date", "Date of examination"),
];

const FINANCE_FIELDS: FieldPairs = &[
    ("txn_id", "Unique transaction identifier"),
    ("account_id", "Linked account identifier"),
    ("txn_date", "Date of transaction"),
    ("amount", "Signed transaction amount"),
    ("merchant", "Merchant/payee"),
    ("category", "Spending category"),
    ("status", "Cleared/pending status"),
];

const WEATHER_FIELDS: FieldPairs = &[
    ("date", "Calendar date"),
    ("location", "Station/city"),
    ("temperature_c", "Air temperature (°C)"),
    ("humidity_pct", "Relative humidity (%)"),
    ("precip_mm", "Precipitation (mm)"),
    ("wind_kph", "Wind speed (kph)"),
    ("condition", "Textual weather condition"),
];

const GENERIC_FIELDS: FieldPairs = &[
    ("id", "Unique identifier"),
    ("name", "Entity name"),
    ("category", "High-level grouping"),
    ("description", "Short description"),
    ("created_at", "Creation timestamp"),
    ("value", "Primary numeric or textual value"),
];

const TEMPLATES: &[Template] = &[
    Template {
        category: TemplateCategory::Commerce,
        keywords: &["ecommerce", "e-commerce", "order", "retail", "shop", "cart"],
        fields: COMMERCE_FIELDS,
    },
    Template {
        category: TemplateCategory::Education,
        keywords: &["student", "education", "exam", "grades", "school", "university"],
        fields: EDUCATION_FIELDS,
    },
    Template {
        category: TemplateCategory::Finance,
        keywords: &["transactions", "bank", "finance", "ledger", "payment"],
        fields: FINANCE_FIELDS,
    },
    Template {
        category: TemplateCategory::Weather,
        keywords: &["weather", "climate", "temperature"],
        fields: WEATHER_FIELDS,
    },
];

impl TemplateCategory {
    /// First category whose keywords occur in `description` (case-insensitive
    /// substring match); `Generic` when none do.
    pub fn classify(description: &str) -> Self {
        let description = description.to_lowercase();
        TEMPLATES
            .iter()
            .find(|template| {
                template
                    .keywords
                    .iter()
                    .any(|keyword| description.contains(keyword))
            })
            .map(|template| template.category)
            .unwrap_or(TemplateCategory::Generic)
    }

    pub fn fields(self) -> FieldPairs {
        TEMPLATES
            .iter()
            .find(|template| template.category == self)
            .map(|template| template.fields)
            .unwrap_or(GENERIC_FIELDS)
    }
}

/// Template `(field name, description)` pairs for a description.
pub fn templates_for(description: &str) -> FieldPairs {
    TemplateCategory::classify(description).fields()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(pairs: FieldPairs) -> Vec<&'static str> {
        pairs.iter().map(|(name, _)| *name).collect()
    }

    #[test]
    fn commerce_wins_over_later_categories() {
        assert_eq!(
            TemplateCategory::classify("Retail bank payment orders"),
            TemplateCategory::Commerce
        );
        assert_eq!(names(templates_for("ECOMMERCE orders"))[0], "order_id");
    }

    #[test]
    fn categories_are_matched_in_priority_order() {
        assert_eq!(
            TemplateCategory::classify("university exam grades"),
            TemplateCategory::Education
        );
        assert_eq!(
            TemplateCategory::classify("ledger of transactions"),
            TemplateCategory::Finance
        );
        assert_eq!(
            TemplateCategory::classify("Daily climate readings"),
            TemplateCategory::Weather
        );
        assert_eq!(
            TemplateCategory::classify("list of rivers"),
            TemplateCategory::Generic
        );
    }

    #[test]
    fn generic_template_has_six_fields() {
        assert_eq!(
            names(templates_for("")),
            vec!["id", "name", "category", "description", "created_at", "value"]
        );
    }

    #[test]
    fn every_template_has_three_to_seven_fields() {
        for category in [
            TemplateCategory::Commerce,
            TemplateCategory::Education,
            TemplateCategory::Finance,
            TemplateCategory::Weather,
            TemplateCategory::Generic,
        ] {
            let count = category.fields().len();
            assert!((3..=7).contains(&count), "{category:?} has {count} fields");
        }
    }
}
