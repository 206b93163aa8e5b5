// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! GraphQL SDL rendering of a mutation schema.
//!
//! Row types (used by `returning` and the single-row fields) and filter types belong to the query
//! side of the schema and are only referred to by name.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use mutation_model::catalog::RootFieldKind;

use crate::{
    output_builder::MutationOutputShape,
    shape::{FieldType, InputTypeRef, scalar_type_name},
    system_builder::MutationSchema,
};

const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

impl MutationSchema {
    pub fn to_sdl(&self) -> String {
        let mut sections = vec![];
        let mut scalars = BTreeSet::new();

        let mut root = vec![format!("type {} {{", self.naming.type_name("mutation_root"))];
        for field in self.fields.values() {
            root.extend(description(&field.description, "  "));

            let arguments: Vec<_> = field
                .arguments
                .iter()
                .map(|argument| {
                    collect_scalars(&argument.typ, &mut scalars);
                    format!("{}: {}", argument.name, self.type_ref(&argument.typ))
                })
                .collect();
            let output = match (&field.output, field.kind) {
                (MutationOutputShape::MultipleRows { type_name, .. }, RootFieldKind::UpdateMany) => {
                    format!("[{type_name}]")
                }
                (output, _) => output.type_name().to_string(),
            };

            if arguments.is_empty() {
                root.push(format!("  {}: {output}", field.name));
            } else {
                root.push(format!("  {}(", field.name));
                root.extend(arguments.into_iter().map(|argument| format!("    {argument}")));
                root.push(format!("  ): {output}"));
            }
        }
        root.push("}".to_string());
        sections.push(root.join("\n"));

        let mut responses: IndexMap<&str, Option<&str>> = IndexMap::new();
        for field in self.fields.values() {
            if let MutationOutputShape::MultipleRows {
                type_name,
                returning,
            } = &field.output
            {
                responses.insert(
                    type_name,
                    returning.as_ref().map(|returning| returning.row_type.as_str()),
                );
            }
        }
        for (type_name, row_type) in responses {
            let mut lines = vec![
                "\"\"\"response of any mutation on the table\"\"\"".to_string(),
                format!("type {type_name} {{"),
                format!("  {}: Int!", self.naming.field_name("affected_rows")),
            ];
            if let Some(row_type) = row_type {
                lines.push(format!(
                    "  {}: [{row_type}!]!",
                    self.naming.field_name("returning")
                ));
            }
            lines.push("}".to_string());
            sections.push(lines.join("\n"));
        }

        for (_, input_type) in self.input_types.iter() {
            let mut lines = description(&input_type.description, "");
            lines.push(format!("input {} {{", input_type.name));
            for field in &input_type.fields {
                collect_scalars(&field.typ, &mut scalars);
                lines.extend(description(&field.description, "  "));
                lines.push(format!("  {}: {}", field.name, self.type_ref(&field.typ)));
            }
            lines.push("}".to_string());
            sections.push(lines.join("\n"));
        }

        for (_, enum_type) in self.enum_types.iter() {
            let mut lines = description(&enum_type.description, "");
            lines.push(format!("enum {} {{", enum_type.name));
            lines.extend(enum_type.values.iter().map(|value| format!("  {}", value.name)));
            lines.push("}".to_string());
            sections.push(lines.join("\n"));
        }

        let scalars = scalars
            .into_iter()
            .filter(|scalar| !BUILTIN_SCALARS.contains(scalar))
            .map(|scalar| format!("scalar {scalar}"));

        scalars
            .chain(sections)
            .collect::<Vec<_>>()
            .join("\n\n")
            + "\n"
    }

    fn type_ref(&self, typ: &FieldType<InputTypeRef>) -> String {
        match typ {
            FieldType::Plain(named) => format!("{}!", self.type_name(named)),
            FieldType::Optional(inner) => {
                let inner = self.type_ref(inner);
                match inner.strip_suffix('!') {
                    Some(nullable) => nullable.to_string(),
                    None => inner,
                }
            }
            FieldType::List(inner) => format!("[{}]!", self.type_ref(inner)),
        }
    }

    fn type_name<'a>(&'a self, typ: &'a InputTypeRef) -> &'a str {
        match typ {
            InputTypeRef::Scalar(column_type) => scalar_type_name(*column_type),
            InputTypeRef::Enum(id) => &self.enum_types[*id].name,
            InputTypeRef::Object(id) => &self.input_types[*id].name,
            InputTypeRef::BoolExp(name) => name,
        }
    }
}

fn description(description: &Option<String>, indent: &str) -> Vec<String> {
    match description {
        Some(text) => vec![format!("{indent}\"\"\"{text}\"\"\"")],
        None => vec![],
    }
}

fn collect_scalars(typ: &FieldType<InputTypeRef>, scalars: &mut BTreeSet<&'static str>) {
    if let InputTypeRef::Scalar(column_type) = typ.innermost() {
        scalars.insert(scalar_type_name(*column_type));
    }
}
