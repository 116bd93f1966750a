//! Subject and template selection per language variant

/// Subject and template file used for one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailVariant {
    pub subject: String,
    pub template: String,
}

/// How template file names are derived
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateNaming {
    /// Pattern containing `{variant}`, e.g. `Ala{variant}.html`
    PerVariant(String),
    /// One template for every recipient
    Fixed(String),
}

impl TemplateNaming {
    pub const VARIANT_TOKEN: &'static str = "{variant}";
}

/// Two-way variant lookup: one primary key, everything else falls back
#[derive(Debug, Clone)]
pub struct VariantTable {
    pub primary_key: String,
    pub primary_subject: String,
    pub fallback_key: String,
    pub fallback_subject: String,
    pub naming: TemplateNaming,
}

impl Default for VariantTable {
    fn default() -> Self {
        Self {
            primary_key: "ru".to_string(),
            primary_subject:
                "Подключайтесь к эфиру и выиграйте Iphone16 🎁 Уже завтра — BI Ecosystem!"
                    .to_string(),
            fallback_key: "kz".to_string(),
            fallback_subject: "Эфирге қосылып, Iphone16 ұтып алыңыз🎁 Ертең BI Ecosystem болады!"
                .to_string(),
            naming: TemplateNaming::PerVariant("Ala{variant}.html".to_string()),
        }
    }
}

impl VariantTable {
    /// Resolve subject and template for a variant key
    ///
    /// Only an exact match on the primary key selects the primary subject.
    pub fn resolve(&self, key: Option<&str>) -> EmailVariant {
        let subject = if key == Some(self.primary_key.as_str()) {
            &self.primary_subject
        } else {
            &self.fallback_subject
        };

        EmailVariant {
            subject: subject.clone(),
            template: self.template_name(key),
        }
    }

    fn template_name(&self, key: Option<&str>) -> String {
        match &self.naming {
            TemplateNaming::Fixed(name) => name.clone(),
            TemplateNaming::PerVariant(pattern) => {
                // keys end up in a file name; anything odd uses the fallback file
                let key = key
                    .filter(|k| is_safe_key(k))
                    .unwrap_or(self.fallback_key.as_str());
                pattern.replace(TemplateNaming::VARIANT_TOKEN, key)
            }
        }
    }
}

fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
