//! The package loader contract.
//!
//! Resolving an import path to a package is an external concern: the
//! checker only needs the exported symbol table. `MapLoader` is an
//! in-memory registry used by tests and by the CLI, which seeds it
//! with a small table of common standard-library packages.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::types::{Basic, FuncSig};
use crate::ast::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjKind {
    Type,
    Var,
    Const,
}

#[derive(Debug, Clone)]
pub struct PkgObj {
    pub kind: ObjKind,
    pub ty: Type,
}

#[derive(Debug)]
pub struct GoPackage {
    pub path: String,
    pub exported: IndexMap<String, PkgObj>,
}

pub trait PackageLoader {
    fn load(&self, path: &str) -> Result<Rc<GoPackage>, String>;
}

#[derive(Default)]
pub struct MapLoader {
    pkgs: HashMap<String, Rc<GoPackage>>,
}

impl MapLoader {
    pub fn new() -> MapLoader {
        MapLoader::default()
    }

    pub fn insert(&mut self, pkg: GoPackage) {
        self.pkgs.insert(pkg.path.clone(), Rc::new(pkg));
    }

    /// A loader pre-seeded with the slice of the standard library the
    /// CLI needs for everyday scripts.
    pub fn with_std() -> MapLoader {
        let mut loader = MapLoader::new();

        let named = |pkg: &str, name: &str| Type::Named {
            package: pkg.to_string(),
            name: name.to_string(),
        };
        let func = |params: Vec<Type>, results: Vec<Type>| {
            Type::Func(FuncSig { params, results })
        };
        let string = Type::Basic(Basic::String);
        let int = Type::Basic(Basic::Int);
        let bytes = Type::Slice(Box::new(Type::Basic(Basic::Byte)));
        let any = Type::Interface(Vec::new());
        let variadic_any = Type::Ellipsis(Box::new(any.clone()));

        let mut fmt = GoPackage {
            path: "fmt".to_string(),
            exported: IndexMap::new(),
        };
        fmt.exported.insert(
            "Println".to_string(),
            PkgObj {
                kind: ObjKind::Var,
                ty: func(
                    vec![variadic_any.clone()],
                    vec![int.clone(), Type::Error],
                ),
            },
        );
        fmt.exported.insert(
            "Printf".to_string(),
            PkgObj {
                kind: ObjKind::Var,
                ty: func(
                    vec![string.clone(), variadic_any.clone()],
                    vec![int.clone(), Type::Error],
                ),
            },
        );
        fmt.exported.insert(
            "Sprintf".to_string(),
            PkgObj {
                kind: ObjKind::Var,
                ty: func(vec![string.clone(), variadic_any.clone()], vec![string.clone()]),
            },
        );
        fmt.exported.insert(
            "Errorf".to_string(),
            PkgObj {
                kind: ObjKind::Var,
                ty: func(vec![string.clone(), variadic_any], vec![Type::Error]),
            },
        );
        loader.insert(fmt);

        let mut os = GoPackage {
            path: "os".to_string(),
            exported: IndexMap::new(),
        };
        os.exported.insert(
            "File".to_string(),
            PkgObj {
                kind: ObjKind::Type,
                ty: named("os", "File"),
            },
        );
        os.exported.insert(
            "Getenv".to_string(),
            PkgObj {
                kind: ObjKind::Var,
                ty: func(vec![string.clone()], vec![string.clone()]),
            },
        );
        os.exported.insert(
            "Environ".to_string(),
            PkgObj {
                kind: ObjKind::Var,
                ty: func(vec![], vec![Type::Slice(Box::new(string.clone()))]),
            },
        );
        os.exported.insert(
            "Open".to_string(),
            PkgObj {
                kind: ObjKind::Var,
                ty: func(
                    vec![string.clone()],
                    vec![Type::Pointer(Box::new(named("os", "File"))), Type::Error],
                ),
            },
        );
        loader.insert(os);

        let mut io = GoPackage {
            path: "io".to_string(),
            exported: IndexMap::new(),
        };
        io.exported.insert(
            "Reader".to_string(),
            PkgObj {
                kind: ObjKind::Type,
                ty: named("io", "Reader"),
            },
        );
        io.exported.insert(
            "Writer".to_string(),
            PkgObj {
                kind: ObjKind::Type,
                ty: named("io", "Writer"),
            },
        );
        loader.insert(io);

        let mut ioutil = GoPackage {
            path: "io/ioutil".to_string(),
            exported: IndexMap::new(),
        };
        ioutil.exported.insert(
            "ReadAll".to_string(),
            PkgObj {
                kind: ObjKind::Var,
                ty: func(vec![named("io", "Reader")], vec![bytes.clone(), Type::Error]),
            },
        );
        ioutil.exported.insert(
            "ReadFile".to_string(),
            PkgObj {
                kind: ObjKind::Var,
                ty: func(vec![string.clone()], vec![bytes.clone(), Type::Error]),
            },
        );
        loader.insert(ioutil);

        let mut strings_pkg = GoPackage {
            path: "strings".to_string(),
            exported: IndexMap::new(),
        };
        strings_pkg.exported.insert(
            "ToUpper".to_string(),
            PkgObj {
                kind: ObjKind::Var,
                ty: func(vec![string.clone()], vec![string.clone()]),
            },
        );
        strings_pkg.exported.insert(
            "TrimSpace".to_string(),
            PkgObj {
                kind: ObjKind::Var,
                ty: func(vec![string.clone()], vec![string.clone()]),
            },
        );
        strings_pkg.exported.insert(
            "Join".to_string(),
            PkgObj {
                kind: ObjKind::Var,
                ty: func(
                    vec![Type::Slice(Box::new(string.clone())), string.clone()],
                    vec![string.clone()],
                ),
            },
        );
        loader.insert(strings_pkg);

        let mut errors_pkg = GoPackage {
            path: "errors".to_string(),
            exported: IndexMap::new(),
        };
        errors_pkg.exported.insert(
            "New".to_string(),
            PkgObj {
                kind: ObjKind::Var,
                ty: func(vec![string], vec![Type::Error]),
            },
        );
        loader.insert(errors_pkg);

        loader
    }
}

impl PackageLoader for MapLoader {
    fn load(&self, path: &str) -> Result<Rc<GoPackage>, String> {
        self.pkgs
            .get(path)
            .cloned()
            .ok_or_else(|| format!("package {:?} not found", path))
    }
}
