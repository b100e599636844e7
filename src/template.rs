use crate::{
    error::{Error, Result},
    readme::ReadmeContext,
    report::FileReport,
    summary::SummaryReport,
};
use std::collections::HashMap;
use tera::{Context, Tera, Value};

const SUMMARY: &str = "summary";
const REPORT: &str = "report";
const README: &str = "readme";

/// Template engine for the text artifacts of an export.
pub(crate) struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Creates a new template engine with the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in template fails to parse.
    pub(crate) fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Register built-in templates
        Self::register_builtin_templates(&mut tera)?;

        // Register custom filters
        tera.register_filter("thousands", Self::thousands_filter);

        Ok(Self { tera })
    }

    fn register_builtin_templates(tera: &mut Tera) -> Result<()> {
        tera.add_raw_template(SUMMARY, include_str!("../templates/summary.tera"))
            .map_err(|e| Error::template(SUMMARY, &e))?;

        tera.add_raw_template(REPORT, include_str!("../templates/report.tera"))
            .map_err(|e| Error::template(REPORT, &e))?;

        tera.add_raw_template(README, include_str!("../templates/readme.tera"))
            .map_err(|e| Error::template(README, &e))?;

        Ok(())
    }

    /// Formats an integer with `,` thousands separators.
    fn thousands_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let Some(n) = value.as_u64() else {
            return Ok(value.clone());
        };

        let digits = n.to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(c);
        }
        Ok(Value::String(out))
    }

    /// Renders `_SUMMARY.txt`.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub(crate) fn render_summary(
        &self,
        project_name: &str,
        export_date: &str,
        summary: &SummaryReport,
    ) -> Result<String> {
        let mut context = Context::new();
        context.insert("project_name", project_name);
        context.insert("export_date", export_date);
        context.insert("usage", &summary.usage_display());
        context.insert("summary", summary);

        self.render(SUMMARY, &context)
    }

    /// Renders the text view of the file report.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub(crate) fn render_report(&self, report: &FileReport) -> Result<String> {
        let mut context = Context::new();
        context.insert("report", report);
        context.insert("selected", &report.selected_groups());
        context.insert("excluded", &report.excluded_groups());

        self.render(REPORT, &context)
    }

    /// Renders the generated README.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub(crate) fn render_readme(&self, readme: &ReadmeContext) -> Result<String> {
        let mut context = Context::new();
        context.insert("ctx", readme);

        self.render(README, &context)
    }

    fn render(&self, name: &str, context: &Context) -> Result<String> {
        self.tera
            .render(name, context)
            .map_err(|e| Error::template(name, &e))
    }
}
