//! Building definitions from the section model.
//!
//! Recognised keys on a risk section: `group`, `group_name`, `name`, `f`,
//! plus everything a parameter section accepts (`formula`, `window`,
//! `upper_bound`, `lower_bound`, `trade_stop`, `graph`). Nested sections are
//! parameters, except `var` which holds named expressions.

use std::sync::Arc;

use log::warn;
use openrisk::{CompileRequest, ExprRole, Expression, ExpressionCompiler};

use crate::definition::RiskDef;
use crate::error::BuildError;
use crate::group::{AttributeTag, GroupSelector};
use crate::param::{RiskParamDef, WindowDef};
use crate::section::{Section, split_list};
use crate::variables::NamedExpression;

/// Section holding a parameter's named expressions.
pub const VAR_SECTION: &str = "var";

struct Builder<'a> {
    risk: &'a str,
    module_path: &'a str,
    compiler: &'a dyn ExpressionCompiler,
}

impl Builder<'_> {
    fn compile(
        &self,
        source: &str,
        role: ExprRole,
        boolean: bool,
        variables: &[String],
    ) -> Result<Arc<dyn Expression>, BuildError> {
        let request = CompileRequest {
            source,
            role,
            boolean,
            variables,
            module_path: self.module_path,
        };
        self.compiler
            .compile(&request)
            .map_err(|source| BuildError::Compile {
                risk: self.risk.to_string(),
                source,
            })
    }

    /// `Ok(None)` when the section has no formula.
    fn param(&self, section: &Section) -> Result<Option<RiskParamDef>, BuildError> {
        let mut declared: Vec<String> = Vec::new();
        let mut variables = Vec::new();
        if let Some(vars) = section.section(VAR_SECTION) {
            for (name, source) in &vars.values {
                let expr = self.compile(source, ExprRole::Variable, false, &declared)?;
                variables.push(NamedExpression::new(name.clone(), expr));
                declared.push(name.clone());
            }
        }

        let graph = wants_graph(section.value("graph"));
        let source = section.value("formula");
        if source.is_empty() {
            if graph {
                warn!("graph only allowable for aggregate formula: {}", section.name);
            }
            return Ok(None);
        }
        let formula = self.compile(source, ExprRole::Formula, false, &declared)?;

        let mut param = RiskParamDef::new(section.name.clone(), formula)
            .with_variables(variables)
            .with_window(parse_window(section.value("window")))
            .with_bounds(
                parse_bounds(section.value("lower_bound")),
                parse_bounds(section.value("upper_bound")),
            )
            .with_trade_stop(parse_go_bool(section.value("trade_stop")).unwrap_or(false));
        if graph {
            param.enable_graph();
        }
        Ok(Some(param))
    }
}

impl RiskDef {
    /// Build a definition from its configuration section.
    ///
    /// The section itself is also a parameter (named after the section) and
    /// goes first when it has a `formula`. Nested parameter sections must
    /// have one.
    pub fn from_section(
        section: &Section,
        module_path: &str,
        compiler: &dyn ExpressionCompiler,
    ) -> Result<Self, BuildError> {
        let b = Builder {
            risk: &section.name,
            module_path,
            compiler,
        };

        let mut def = RiskDef::new(section.name.clone()).with_module_path(module_path);
        let display_name = section.value("name");
        if !display_name.is_empty() {
            def = def.with_display_name(display_name);
        }

        let mut names: Vec<String> = split_list(section.value("group_name"))
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut selectors = Vec::new();
        for (i, token) in split_list(section.value("group")).into_iter().enumerate() {
            let tag = AttributeTag::parse(token);
            let source = if token == "*" { "true" } else { token };
            if i >= names.len() {
                names.push(source.to_string());
            }
            let selector = match tag {
                Some(tag) => GroupSelector::Attribute(tag),
                None => {
                    let expr = b.compile(source, ExprRole::Group, true, &[])?;
                    GroupSelector::predicate(expr, names[i].clone())
                }
            };
            selectors.push(selector);
        }
        def.set_groups(selectors, names);

        let filter = section.value("f");
        if !filter.is_empty() {
            def.set_filter(Some(b.compile(filter, ExprRole::Filter, true, &[])?));
        }

        let mut params = Vec::new();
        for sub in section.sections.iter().filter(|s| s.name != VAR_SECTION) {
            let param = b.param(sub)?.ok_or_else(|| BuildError::MissingFormula {
                risk: section.name.clone(),
                parameter: sub.name.clone(),
            })?;
            params.push(param);
        }
        if let Some(root) = b.param(section)? {
            params.insert(0, root);
        }
        for param in params {
            def.push_param(param);
        }
        Ok(def)
    }
}

impl RiskParamDef {
    /// Build a single parameter from its section.
    pub fn from_section(
        section: &Section,
        module_path: &str,
        compiler: &dyn ExpressionCompiler,
    ) -> Result<Self, BuildError> {
        let b = Builder {
            risk: &section.name,
            module_path,
            compiler,
        };
        b.param(section)?.ok_or_else(|| BuildError::MissingFormula {
            risk: section.name.clone(),
            parameter: section.name.clone(),
        })
    }
}

/// Comma list of floats; tokens that do not parse become NaN.
pub fn parse_bounds(s: &str) -> Vec<f64> {
    split_list(s)
        .into_iter()
        .map(|t| t.parse().unwrap_or(f64::NAN))
        .collect()
}

/// `seconds,type`. Unparsable seconds leave 0.
pub fn parse_window(s: &str) -> WindowDef {
    let parts = split_list(s);
    WindowDef {
        seconds: parts.first().and_then(|t| t.parse().ok()).unwrap_or(0),
        kind: parts.get(1).map(|t| t.to_string()).unwrap_or_default(),
    }
}

/// Boolean in the strict spellings config files have always used.
pub fn parse_go_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn wants_graph(s: &str) -> bool {
    matches!(s.to_ascii_lowercase().as_str(), "true" | "y" | "yes" | "1")
}
