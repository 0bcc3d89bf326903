//! Deciding which functions become methods.

use crate::ast::Field;
use crate::ast::FuncDecl;
use crate::ast::Package;
use crate::ast::SourceFile;
use crate::ast::TypeExpr;
use std::collections::BTreeSet;
use strum_macros::AsRefStr;

/// Outcome of [Classifier::classify].
#[derive(Debug, PartialEq, Clone)]
pub enum Verdict<'a> {
    Accept(Candidate<'a>),
    Reject(Rejection),
}

/// An accepted function, split into its receiver and the remaining parameters.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Candidate<'a> {
    pub decl: &'a FuncDecl,
    pub receiver_name: &'a str,
    pub receiver_type: &'a TypeExpr,
    pub params: &'a [Field],
}

/// Why a function does not become a method.
#[derive(Debug, PartialEq, Eq, Clone, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Rejection {
    /// Already a method.
    Method,

    NoParameters,

    /// The first parameter slot does not declare exactly one name, e.g. `a, b T`.
    ///
    /// Not supported yet.
    GroupedParameter,

    /// Has type parameters.
    Generic,

    /// A parameter named `_` cannot be forwarded.
    BlankParameter,

    /// The canonical type of the first parameter is not an allowed receiver type.
    ReceiverType(String),
}

/// Accepts free-standing functions whose first parameter has one of the allowed receiver
/// types.
///
/// Types are compared by their exact canonical identity, e.g.
/// `*github.com/jupiterrider/purego-sdl3/sdl.Window`.
pub struct Classifier<'a> {
    receivers: &'a BTreeSet<String>,
}

impl<'a> Classifier<'a> {
    pub fn new(receivers: &'a BTreeSet<String>) -> Self {
        Self { receivers }
    }

    /// Decides whether `decl`, declared in `file`, becomes a method.
    pub fn classify<'d>(
        &self,
        package: &Package,
        file: &SourceFile,
        decl: &'d FuncDecl,
    ) -> Verdict<'d> {
        if decl.receiver.is_some() {
            return Verdict::Reject(Rejection::Method);
        }
        let (first, params) = match decl.params.split_first() {
            Some(split) => split,
            None => return Verdict::Reject(Rejection::NoParameters),
        };
        let receiver_name = match first.names.as_slice() {
            [name] => name,
            _ => return Verdict::Reject(Rejection::GroupedParameter),
        };
        if decl.type_params.is_some() {
            return Verdict::Reject(Rejection::Generic);
        }
        if decl
            .params
            .iter()
            .flat_map(|p| p.names.iter())
            .any(|name| name == "_")
        {
            return Verdict::Reject(Rejection::BlankParameter);
        }

        log::debug!("func: {}", decl.name);
        let ty = package.type_of_field(file, first);
        log::debug!("first param name: {}", receiver_name);
        log::debug!("first param type: {}", ty);
        if self.receivers.contains(&ty) {
            Verdict::Accept(Candidate {
                decl,
                receiver_name,
                receiver_type: &first.ty,
                params,
            })
        } else {
            Verdict::Reject(Rejection::ReceiverType(ty))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::sample;

    fn classify<'a>(package: &'a Package, receivers: &BTreeSet<String>, func: &str) -> Verdict<'a> {
        Classifier::new(receivers).classify(package, &package.files[0], sample::func(package, func))
    }

    #[test]
    fn accept() {
        let package = sample::window();
        let config = sample::config();
        let func = sample::func(&package, "GetWindowSize");
        let expected = Verdict::Accept(Candidate {
            decl: func,
            receiver_name: "win",
            receiver_type: &func.params[0].ty,
            params: &func.params[1..],
        });
        assert_eq!(expected, classify(&package, &config.receivers, "GetWindowSize"));
        for name in ["DestroyWindow", "RenderPresent"] {
            assert!(matches!(
                classify(&package, &config.receivers, name),
                Verdict::Accept(Candidate { decl, .. }) if decl.name == name
            ));
        }
    }

    #[test]
    fn parenthesized_receiver() {
        let package = sample::package("package sdl\n\nfunc DestroyWindow(win (*Window)) {}\n");
        let config = sample::config();
        assert!(matches!(
            classify(&package, &config.receivers, "DestroyWindow"),
            Verdict::Accept(Candidate { receiver_name: "win", .. })
        ));
    }

    #[test]
    fn reject() {
        let package = sample::window();
        let config = sample::config();
        assert_eq!(
            Verdict::Reject(Rejection::ReceiverType(format!("*{}.Event", sample::IMPORT_PATH))),
            classify(&package, &config.receivers, "Poll")
        );
        assert_eq!(
            Verdict::Reject(Rejection::Method),
            classify(&package, &config.receivers, "Hide")
        );
        assert_eq!(
            Verdict::Reject(Rejection::NoParameters),
            classify(&package, &config.receivers, "Init")
        );
        assert_eq!(
            Verdict::Reject(Rejection::BlankParameter),
            classify(&package, &config.receivers, "HideWindow")
        );
    }

    #[test]
    fn grouped_parameter() {
        let package = sample::window();
        let receivers = std::iter::once("int".to_owned()).collect();
        assert_eq!(
            Verdict::Reject(Rejection::GroupedParameter),
            classify(&package, &receivers, "Foo")
        );
    }

    #[test]
    fn anonymous_parameter() {
        let package = sample::package("package sdl\n\nfunc Destroy(*Window) {}\n");
        let config = sample::config();
        assert_eq!(
            Verdict::Reject(Rejection::GroupedParameter),
            classify(&package, &config.receivers, "Destroy")
        );
    }

    #[test]
    fn generic() {
        let package =
            sample::package("package sdl\n\nfunc Get[T any](win *Window, key string) T {\n\tpanic(key)\n}\n");
        let config = sample::config();
        assert_eq!(
            Verdict::Reject(Rejection::Generic),
            classify(&package, &config.receivers, "Get")
        );
    }

    #[test]
    fn variadic_receiver() {
        let package = sample::package("package sdl\n\nfunc DestroyAll(wins ...*Window) {}\n");
        let config = sample::config();
        assert_eq!(
            Verdict::Reject(Rejection::ReceiverType(format!("[]*{}.Window", sample::IMPORT_PATH))),
            classify(&package, &config.receivers, "DestroyAll")
        );
    }

    #[test]
    fn exact_match_only() {
        let package = sample::package("package sdl\n\nfunc CopyWindow(win Window) {}\n");
        let config = sample::config();
        assert_eq!(
            Verdict::Reject(Rejection::ReceiverType(format!("{}.Window", sample::IMPORT_PATH))),
            classify(&package, &config.receivers, "CopyWindow")
        );
    }

    #[test]
    fn idempotent() {
        let package = sample::window();
        let config = sample::config();
        let classifier = Classifier::new(&config.receivers);
        for name in ["DestroyWindow", "Poll", "Foo", "Hide"] {
            let func = sample::func(&package, name);
            let first = classifier.classify(&package, &package.files[0], func);
            let second = classifier.classify(&package, &package.files[0], func);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn rejection_names() {
        assert_eq!("grouped-parameter", Rejection::GroupedParameter.as_ref());
        assert_eq!("receiver-type", Rejection::ReceiverType("int".into()).as_ref());
    }
}
