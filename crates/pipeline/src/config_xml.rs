// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project manifest (`config.xml`) parsing.
//!
//! Reads the pieces the pipeline acts on: project name and id, engines,
//! plugins with their variables, and icon/splash references. Legacy
//! `cocoon:platform` / `cocoon:plugin` elements migrate into standard
//! engine / plugin entries, with nested `param` children preserved as
//! plugin variables.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigXmlError {
    #[error("config.xml is not well-formed: {0}")]
    Malformed(#[from] roxmltree::Error),
    #[error("config.xml has no <name> element")]
    MissingName,
}

/// A platform engine to install for this project.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRef {
    pub name: String,
    pub spec: Option<String>,
}

impl EngineRef {
    /// Spec handed to the engine installer; absent specs install `latest`.
    pub fn install_spec(&self) -> &str {
        self.spec.as_deref().unwrap_or("latest")
    }
}

/// A plugin to install, with its variables.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginRef {
    pub name: String,
    pub spec: Option<String>,
    pub variables: Vec<(String, String)>,
}

impl PluginRef {
    /// Spec handed to the plugin installer; absent specs default to `*`.
    pub fn install_spec(&self) -> &str {
        self.spec.as_deref().unwrap_or("*")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    pub name: String,
    pub id: Option<String>,
    pub engines: Vec<EngineRef>,
    pub plugins: Vec<PluginRef>,
    /// Relative paths referenced by `<icon src>` elements.
    pub icons: Vec<String>,
    /// Relative paths referenced by `<splash src>` elements.
    pub splashes: Vec<String>,
}

impl ProjectConfig {
    /// The engine entry for a platform wire name, if declared.
    pub fn engine_for(&self, platform: &str) -> Option<&EngineRef> {
        self.engines.iter().find(|e| e.name == platform)
    }
}

pub fn parse(xml: &str) -> Result<ProjectConfig, ConfigXmlError> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();

    let name = root
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "name")
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(ConfigXmlError::MissingName)?;

    let id = root.attribute("id").map(str::to_string);

    let mut engines = Vec::new();
    let mut plugins = Vec::new();
    let mut icons = Vec::new();
    let mut splashes = Vec::new();

    for node in root.children().filter(|n| n.is_element()) {
        let tag = node.tag_name().name();
        let namespaced = node.tag_name().namespace().is_some()
            && node.tag_name().namespace() != root.tag_name().namespace();

        match tag {
            "engine" => {
                if let Some(engine_name) = node.attribute("name") {
                    engines.push(EngineRef {
                        name: engine_name.to_string(),
                        spec: node.attribute("spec").map(str::to_string),
                    });
                }
            }
            // Legacy cocoon:platform carries the engine spec as `version`.
            "platform" if namespaced => {
                if let Some(engine_name) = node.attribute("name") {
                    engines.push(EngineRef {
                        name: engine_name.to_string(),
                        spec: node
                            .attribute("version")
                            .or_else(|| node.attribute("spec"))
                            .map(str::to_string),
                    });
                }
            }
            "plugin" => {
                if let Some(plugin_name) = node.attribute("name") {
                    // Standard plugins use <variable>, legacy cocoon
                    // plugins use <param>; both become variables.
                    let variables = node
                        .children()
                        .filter(|c| {
                            c.is_element()
                                && matches!(c.tag_name().name(), "variable" | "param")
                        })
                        .filter_map(|c| {
                            Some((
                                c.attribute("name")?.to_string(),
                                c.attribute("value").unwrap_or_default().to_string(),
                            ))
                        })
                        .collect();
                    plugins.push(PluginRef {
                        name: plugin_name.to_string(),
                        spec: node
                            .attribute("spec")
                            .or_else(|| node.attribute("version"))
                            .map(str::to_string),
                        variables,
                    });
                }
            }
            "icon" => {
                if let Some(src) = node.attribute("src") {
                    icons.push(src.to_string());
                }
            }
            "splash" => {
                if let Some(src) = node.attribute("src") {
                    splashes.push(src.to_string());
                }
            }
            _ => {}
        }
    }

    Ok(ProjectConfig {
        name,
        id,
        engines,
        plugins,
        icons,
        splashes,
    })
}

#[cfg(test)]
#[path = "config_xml_tests.rs"]
mod tests;
