mod loader;
mod nom_parser;
mod yaml_parser;

pub use self::{
    loader::{load, load_str},
    nom_parser::{parse_file, NodeArg, TreeDef, TreeRootDef, TreeSource},
    yaml_parser::load_yaml,
};
