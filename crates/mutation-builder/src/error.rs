// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::{self, Display};

use thiserror::Error;

/// A problem with the catalog or permissions that prevents building one mutation field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaBuildingError {
    #[error("'{0}' is not a valid GraphQL name")]
    InvalidName(String),

    #[error("Constraint '{constraint}' on table '{table}' has no resolvable columns")]
    UnresolvableConstraint { table: String, constraint: String },

    #[error("Column '{column}' not found in table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Table '{0}' not found")]
    UnknownTable(String),

    #[error("Mutation field '{0}' is already defined")]
    DuplicateField(String),

    #[error("Type '{0}' is already defined for another table or grant")]
    DuplicateType(String),

    #[error("{0}")]
    Generic(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// Location of a value inside the arguments of a request, such as `insert_articles.objects[1].title`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArgumentPath(Vec<PathSegment>);

impl ArgumentPath {
    pub fn root(name: &str) -> Self {
        Self(vec![PathSegment::Field(name.to_string())])
    }

    pub fn field(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Field(name.to_string()));
        Self(segments)
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl Display for ArgumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => write!(f, "{name}")?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentErrorKind {
    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}' not found in type: '{type_name}'")]
    UnexpectedField { field: String, type_name: String },

    #[error("expected {expected}, but found {found}")]
    InvalidType { expected: String, found: String },

    #[error("unexpected value '{value}' for enum '{enum_name}'")]
    UnknownEnumValue { enum_name: String, value: String },

    #[error("at least one of {} is required", .0.join(", "))]
    MissingUpdateOperator(Vec<String>),

    #[error("column '{column}' found in multiple operators: {}", .operators.join(", "))]
    DuplicateColumn {
        column: String,
        operators: Vec<String>,
    },

    #[error("no mutation field named '{0}'")]
    UnknownMutationField(String),

    #[error("{0}")]
    Invalid(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} (at '{path}')")]
pub struct ArgumentError {
    pub path: ArgumentPath,
    pub kind: ArgumentErrorKind,
}

/// All problems found while lowering a request.
///
/// Lowering keeps going past the first problem, so the client sees every invalid argument at once.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentErrors(Vec<ArgumentError>);

impl ArgumentErrors {
    pub fn new(path: &ArgumentPath, kind: ArgumentErrorKind) -> Self {
        Self(vec![ArgumentError {
            path: path.clone(),
            kind,
        }])
    }

    pub fn errors(&self) -> &[ArgumentError] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<ArgumentError> {
        self.0
    }

    fn extend(&mut self, other: ArgumentErrors) {
        self.0.extend(other.0)
    }
}

impl From<ArgumentError> for ArgumentErrors {
    fn from(error: ArgumentError) -> Self {
        Self(vec![error])
    }
}

impl Display for ArgumentErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ArgumentErrors {}

/// Accumulates errors from independent parts of a request
#[derive(Default)]
pub(crate) struct ErrorCollector(Option<ArgumentErrors>);

impl ErrorCollector {
    pub fn push(&mut self, errors: ArgumentErrors) {
        match &mut self.0 {
            Some(existing) => existing.extend(errors),
            None => self.0 = Some(errors),
        }
    }

    /// Keep the value if `result` is a success, otherwise record its errors
    pub fn take<T>(&mut self, result: Result<T, ArgumentErrors>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(errors) => {
                self.push(errors);
                None
            }
        }
    }

    pub fn finish<T>(self, value: T) -> Result<T, ArgumentErrors> {
        match self.0 {
            Some(errors) => Err(errors),
            None => Ok(value),
        }
    }
}

/// Collect all successful values, or all errors if any of the results failed
pub(crate) fn collect_all<T>(
    results: impl IntoIterator<Item = Result<T, ArgumentErrors>>,
) -> Result<Vec<T>, ArgumentErrors> {
    let mut collector = ErrorCollector::default();
    let values: Vec<T> = results
        .into_iter()
        .filter_map(|result| collector.take(result))
        .collect();
    collector.finish(values)
}

pub(crate) fn join<A, B>(
    a: Result<A, ArgumentErrors>,
    b: Result<B, ArgumentErrors>,
) -> Result<(A, B), ArgumentErrors> {
    match (a, b) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
        (Err(mut e1), Err(e2)) => {
            e1.extend(e2);
            Err(e1)
        }
    }
}
