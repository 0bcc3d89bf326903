//! Method synthesis.
//!
//! A method wraps an accepted function: its first parameter becomes the receiver and the body
//! forwards every parameter to the function.

use crate::ast::Field;
use crate::classify::Candidate;
use crate::ast::TypeExpr;
use std::collections::BTreeMap;

/// Method declaration.
///
/// Types, parameters and results are borrowed from the wrapped [FuncDecl](crate::ast::FuncDecl).
#[derive(Debug, PartialEq)]
pub struct MethodDecl<'a> {
    /// Doc comment lines copied from the wrapped function.
    pub doc: Vec<String>,
    pub receiver: Receiver<'a>,
    pub name: String,
    pub params: &'a [Field],
    pub results: &'a [Field],
    pub body: Stmt<'a>,
}

#[derive(Debug, PartialEq)]
pub struct Receiver<'a> {
    pub name: &'a str,
    pub ty: &'a TypeExpr,
}

/// The only statement in a method body.
#[derive(Debug, PartialEq)]
pub enum Stmt<'a> {
    Return(CallExpr<'a>),
    Expr(CallExpr<'a>),
}

impl<'a> Stmt<'a> {
    pub fn call(&self) -> &CallExpr<'a> {
        match self {
            Self::Return(call) | Self::Expr(call) => call,
        }
    }
}

/// Call of the wrapped function.
#[derive(Debug, PartialEq)]
pub struct CallExpr<'a> {
    pub callee: &'a str,
    pub args: Vec<&'a str>,

    /// The last argument is spread with `...`.
    pub ellipsis: bool,
}

/// Builds methods, renaming them through a lookup table.
pub struct Synthesizer<'a> {
    rename: &'a BTreeMap<String, String>,
}

impl<'a> Synthesizer<'a> {
    pub fn new(rename: &'a BTreeMap<String, String>) -> Self {
        Self { rename }
    }

    /// Name of the method wrapping `function`.
    pub fn method_name(&self, function: &str) -> String {
        self.rename
            .get(function)
            .cloned()
            .unwrap_or_else(|| function.to_owned())
    }

    /// Wraps a function accepted by the [Classifier](crate::classify::Classifier).
    pub fn synthesize<'d>(&self, candidate: Candidate<'d>) -> MethodDecl<'d> {
        let decl = candidate.decl;
        let call = CallExpr {
            callee: &decl.name,
            args: decl
                .params
                .iter()
                .flat_map(|p| p.names.iter())
                .map(String::as_str)
                .collect(),
            ellipsis: decl.params.last().map(|p| p.variadic).unwrap_or(false),
        };
        let body = if decl.results.is_empty() {
            Stmt::Expr(call)
        } else {
            Stmt::Return(call)
        };

        MethodDecl {
            doc: decl.doc.clone().unwrap_or_default(),
            receiver: Receiver {
                name: candidate.receiver_name,
                ty: candidate.receiver_type,
            },
            name: self.method_name(&decl.name),
            params: candidate.params,
            results: &decl.results,
            body,
        }
    }
}
