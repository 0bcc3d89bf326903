//! Sample packages for testing.

use super::*;
use crate::classify::Candidate;
use crate::classify::Classifier;
use crate::classify::Verdict;
use crate::config::Config;

pub(crate) const IMPORT_PATH: &str = "github.com/jupiterrider/purego-sdl3/sdl";

/// Parses a single-file package under [IMPORT_PATH].
pub(crate) fn package(source: &str) -> Package {
    Package::parse(
        IMPORT_PATH.into(),
        PathBuf::from("sdl"),
        vec![(PathBuf::from("sdl/sample.go"), source.to_owned())],
    )
    .unwrap()
}

/// Finds a function declared in a sample package.
pub(crate) fn func<'a>(package: &'a Package, name: &str) -> &'a FuncDecl {
    package
        .files
        .iter()
        .flat_map(|f| f.decls.iter())
        .find_map(|d| match d {
            Decl::Func(func) if func.name == name => Some(func),
            _ => None,
        })
        .expect("No such function")
}

pub(crate) fn config() -> Config {
    Config::default()
}

/// Classifies a function of a single-file sample package with the default config.
///
/// # Panics
///
/// If the function is rejected.
pub(crate) fn accept<'a>(package: &Package, func: &'a FuncDecl) -> Candidate<'a> {
    let config = config();
    match Classifier::new(&config.receivers).classify(package, &package.files[0], func) {
        Verdict::Accept(candidate) => candidate,
        Verdict::Reject(rejection) => panic!("`{}` rejected: {}", func.name, rejection.as_ref()),
    }
}

/// A package with a little of everything.
pub(crate) fn window() -> Package {
    package(
        r#"package sdl

import (
	"unsafe"

	"github.com/ebitengine/purego"
)

type Window struct{}

type Renderer struct{}

type Event struct{}

// DestroyWindow destroys a window.
func DestroyWindow(win *Window) {
	purego.SyscallN(0, uintptr(unsafe.Pointer(win)))
}

func GetWindowSize(win *Window, w *int32, h *int32) bool {
	return false
}

func SetWindowTitle(win *Window, title string) bool {
	return false
}

func Poll(ev *Event) bool {
	return false
}

func Foo(a, b int) {}

func (win *Window) Hide() bool {
	return HideWindow(win)
}

func HideWindow(_ *Window) bool {
	return false
}

func Init() bool {
	return true
}

func RenderPresent(renderer *Renderer) bool {
	return true
}
"#,
    )
}
