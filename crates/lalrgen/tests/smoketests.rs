use lalrgen::syntax;
use std::{env, path::PathBuf};

macro_rules! define_tests {
    ($($name:ident => $consistent:expr),*$(,)?) => {$(
        #[test]
        fn $name() {
            let grammar = syntax::parse_file(
                PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap())
                    .join(concat!("tests/grammars/", stringify!($name), ".g"))
            ).unwrap();
            let generated = lalrgen::compute(&grammar).unwrap();
            assert_eq!(generated.table.is_consistent(), $consistent);
            assert_eq!(generated.table.states.len(), generated.lalr.states.len());
            assert!(generated.lalr.states.len() <= generated.canonical.states.len());
        }
    )*};
}

define_tests! {
    cc => true,
    arithmetic => true,
    epsilon => true,
    json => true,
    dangling_else => false,
    not_lalr => false,
}
