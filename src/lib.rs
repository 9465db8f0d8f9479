pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod class;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod lox;
pub mod parser;
pub mod repl;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;
