// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Thin XML front-end: reads a model file and builds the owned
//! [`FeatureModel`] AST. This module knows nothing about variable synthesis
//! or MDD algebra; it only understands the FeatureIDE-style element
//! vocabulary of the input model file format.

use std::fs;
use std::path::Path;

use roxmltree::{Document, Node};

use crate::error::{Error, Result};
use crate::model::{FeatureData, FeatureModel, FeatureNode, Formula};

pub fn load(path: &Path) -> Result<FeatureModel> {
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text)
}

pub fn parse(text: &str) -> Result<FeatureModel> {
    let doc = Document::parse(text).map_err(|e| Error::Xml(e.to_string()))?;
    let root_elem = doc.root_element();

    let struct_node = root_elem
        .children()
        .find(|n| n.is_element() && n.has_tag_name("struct"))
        .ok_or_else(|| Error::Xml("missing <struct> element".to_string()))?;

    let root_feature = struct_node
        .children()
        .find(|n| n.is_element())
        .ok_or_else(|| Error::Xml("<struct> has no feature-tree root".to_string()))?;

    let root = parse_tree_node(root_feature)?;

    let mut constraints = Vec::new();
    if let Some(constraints_node) = root_elem
        .children()
        .find(|n| n.is_element() && n.has_tag_name("constraints"))
    {
        for rule in constraints_node
            .children()
            .filter(|n| n.is_element() && n.has_tag_name("rule"))
        {
            let formula_node = rule
                .children()
                .find(|n| n.is_element())
                .ok_or_else(|| Error::Xml("<rule> has no formula child".to_string()))?;
            constraints.push(parse_formula(formula_node)?);
        }
    }

    Ok(FeatureModel { root, constraints })
}

fn parse_tree_node(node: Node<'_, '_>) -> Result<FeatureNode> {
    let tag = node.tag_name().name();
    let children: Vec<FeatureNode> = node
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() != "description")
        .map(parse_tree_node)
        .collect::<Result<_>>()?;

    match tag {
        "and" | "or" | "alt" | "feature" => {
            let data = feature_data(node)?;
            Ok(match tag {
                "and" => FeatureNode::And(data, children),
                "or" => FeatureNode::Or(data, children),
                "alt" => FeatureNode::Alt(data, children),
                _ => FeatureNode::Feature(data),
            })
        }
        other => Err(Error::InvalidNodeKind(other.to_string())),
    }
}

fn feature_data(node: Node<'_, '_>) -> Result<FeatureData> {
    let name = node
        .attribute("name")
        .ok_or_else(|| Error::MissingAttribute {
            node: node.tag_name().name().to_string(),
            attribute: "name",
        })?
        .to_string();
    let mandatory = node.attribute("mandatory") == Some("true");
    let hidden = node.attribute("hidden") == Some("true");
    Ok(FeatureData {
        name,
        mandatory,
        hidden,
    })
}

fn parse_formula(node: Node<'_, '_>) -> Result<Formula> {
    let tag = node.tag_name().name();
    match tag {
        "var" => Ok(Formula::Var(node.text().unwrap_or_default().trim().to_string())),
        "not" => {
            let child = only_child(node)?;
            Ok(Formula::Not(Box::new(parse_formula(child)?)))
        }
        "imp" => {
            let (left, right) = two_children(node)?;
            Ok(Formula::Imp(
                Box::new(parse_formula(left)?),
                Box::new(parse_formula(right)?),
            ))
        }
        "eq" => {
            let (left, right) = two_children(node)?;
            Ok(Formula::Eq(
                Box::new(parse_formula(left)?),
                Box::new(parse_formula(right)?),
            ))
        }
        "disj" => Ok(Formula::Disj(
            element_children(node).map(parse_formula).collect::<Result<_>>()?,
        )),
        "conj" => Ok(Formula::Conj(
            element_children(node).map(parse_formula).collect::<Result<_>>()?,
        )),
        other => Err(Error::InvalidNodeKind(other.to_string())),
    }
}

fn element_children<'a>(node: Node<'a, 'a>) -> impl Iterator<Item = Node<'a, 'a>> {
    node.children().filter(|n| n.is_element())
}

fn only_child<'a>(node: Node<'a, 'a>) -> Result<Node<'a, 'a>> {
    element_children(node)
        .next()
        .ok_or_else(|| Error::Xml(format!("<{}> expects one child", node.tag_name().name())))
}

fn two_children<'a>(node: Node<'a, 'a>) -> Result<(Node<'a, 'a>, Node<'a, 'a>)> {
    let mut it = element_children(node);
    let left = it
        .next()
        .ok_or_else(|| Error::Xml(format!("<{}> expects two children", node.tag_name().name())))?;
    let right = it
        .next()
        .ok_or_else(|| Error::Xml(format!("<{}> expects two children", node.tag_name().name())))?;
    Ok((left, right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_tiny_tree_with_no_constraints() {
        let xml = r#"
            <featureModel>
                <struct>
                    <and name="Root" mandatory="true">
                        <feature name="A" mandatory="true"/>
                        <feature name="B"/>
                    </and>
                </struct>
            </featureModel>
        "#;
        let model = parse(xml).unwrap();
        assert_eq!(model.root.name(), "Root");
        assert_eq!(model.root.children().len(), 2);
        assert!(model.constraints.is_empty());
    }

    #[test]
    fn parses_cross_tree_constraints() {
        let xml = r#"
            <featureModel>
                <struct>
                    <and name="Root" mandatory="true">
                        <feature name="A"/>
                        <feature name="B"/>
                    </and>
                </struct>
                <constraints>
                    <rule><imp><var>A</var><var>B</var></imp></rule>
                    <rule><not><var>A</var></not></rule>
                </constraints>
            </featureModel>
        "#;
        let model = parse(xml).unwrap();
        assert_eq!(model.constraints.len(), 2);
        assert_eq!(
            model.constraints[0],
            Formula::Imp(
                Box::new(Formula::Var("A".to_string())),
                Box::new(Formula::Var("B".to_string()))
            )
        );
    }

    #[test]
    fn rejects_an_unknown_tree_element() {
        let xml = r#"<fm><struct><bogus name="X"/></struct></fm>"#;
        assert!(matches!(parse(xml), Err(Error::InvalidNodeKind(_))));
    }

    #[test]
    fn rejects_a_missing_name_attribute() {
        let xml = r#"<fm><struct><feature/></struct></fm>"#;
        assert!(matches!(parse(xml), Err(Error::MissingAttribute { .. })));
    }

    #[test]
    fn description_nodes_are_ignored() {
        let xml = r#"
            <fm><struct>
                <and name="Root" mandatory="true">
                    <description>explanatory text</description>
                    <feature name="A"/>
                </and>
            </struct></fm>
        "#;
        let model = parse(xml).unwrap();
        assert_eq!(model.root.children().len(), 1);
    }
}
