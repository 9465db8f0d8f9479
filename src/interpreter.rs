//! Tree‑walking evaluator.
//!
//! Statements are executed for effect and expressions evaluate to a
//! [`Value`].  Variable accesses use the distance table produced by the
//! [`Resolver`](crate::resolver::Resolver); names missing from the table are
//! looked up in the global scope.
//!
//! `return` travels up the Rust call stack as [`Unwind::Return`], a variant
//! kept apart from [`Unwind::Error`] so a function call can tell the two
//! apart and only ever catches the former.

use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::callable::{natives, Callable, LoxFunction};
use crate::class::{LoxClass, LoxInstance};
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Why evaluation stopped early.
#[derive(Debug)]
pub enum Unwind {
    /// A runtime error: abandons the rest of the program.
    Error(LoxError),

    /// A `return` statement carrying its value up to the enclosing call.
    Return(Value),
}

impl From<LoxError> for Unwind {
    fn from(e: LoxError) -> Self {
        Unwind::Error(e)
    }
}

/// Result of executing or evaluating one node.
pub type Exec<T> = std::result::Result<T, Unwind>;

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: Locals,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a new Interpreter printing to stdout, with the native
    /// functions (`clock`) defined globally.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }

    /// Creates a new Interpreter whose `print` statements write to `out`.
    pub fn with_output<W: Write + 'static>(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Environment::new().into_ref();

        for native in natives() {
            debug!("Defining native function '{}'", native.name);

            globals.borrow_mut().define(
                native.name,
                Value::Callable(Callable::Native(Rc::new(native))),
            );
        }

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: Locals::new(),
            out: Box::new(out),
        }
    }

    /// Merge a resolver distance table into the interpreter.  Tables
    /// accumulate so functions defined by earlier runs keep working.
    pub fn resolve(&mut self, locals: Locals) {
        debug!("Recording {} resolved local(s)", locals.len());

        self.locals.extend(locals);
    }

    /// Drop distance entries for nodes that no longer exist.
    pub fn forget<I: IntoIterator<Item = ExprId>>(&mut self, ids: I) {
        for id in ids {
            self.locals.remove(&id);
        }

        debug!("{} resolved local(s) still recorded", self.locals.len());
    }

    /// Number of recorded distance entries.
    pub fn local_count(&self) -> usize {
        self.locals.len()
    }

    /// Interprets a list of statements (a "program").  Stops at the first
    /// runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        info!("Interpreting {} statement(s)", statements.len());

        let result: Exec<()> = statements.iter().try_for_each(|stmt| self.execute(stmt));
        self.out.flush()?;

        match result {
            Ok(()) | Err(Unwind::Return(_)) => {
                info!("Interpretation completed successfully");
                Ok(())
            }
            Err(Unwind::Error(e)) => {
                debug!("Interpretation aborted: {}", e);
                Err(e)
            }
        }
    }

    /// Evaluate a standalone expression (the `evaluate` subcommand).
    pub fn evaluate_expression(&mut self, expr: &Expr) -> Result<Value> {
        match self.evaluate(expr) {
            Ok(value) => Ok(value),
            Err(Unwind::Error(e)) => Err(e),
            Err(Unwind::Return(value)) => Ok(value),
        }
    }

    // ───────────────────────────── statements ──────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> Exec<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value).map_err(LoxError::from)?;
                debug!("Printed value: {}", value);
            }

            Stmt::Var { name, initializer } => {
                debug!("Defining variable '{}'", name.lexeme);

                match initializer {
                    Some(expr) => {
                        let value: Value = self.evaluate(expr)?;
                        self.environment.borrow_mut().define(&name.lexeme, value);
                    }
                    None => self.environment.borrow_mut().declare(&name.lexeme),
                }
            }

            Stmt::Block(statements) => {
                let environment: EnvRef =
                    Environment::with_enclosing(Rc::clone(&self.environment)).into_ref();
                self.execute_block(statements, environment)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );
                self.environment.borrow_mut().define(
                    &declaration.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);

                return Err(Unwind::Return(value));
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                debug!("Defining class '{}'", name.lexeme);

                let superclass: Option<Rc<LoxClass>> = match superclass {
                    Some(expr) => match self.evaluate(expr)? {
                        Value::Callable(Callable::Class(class)) => Some(class),
                        _ => {
                            let token: &Token = match expr {
                                Expr::Variable { name, .. } => name,
                                _ => name,
                            };
                            return Err(
                                LoxError::runtime(token, "Superclass must be a class.").into()
                            );
                        }
                    },
                    None => None,
                };

                self.environment.borrow_mut().declare(&name.lexeme);

                // Methods of a subclass close over a scope binding `super`.
                let method_scope: EnvRef = match &superclass {
                    Some(superclass) => {
                        let mut scope = Environment::with_enclosing(Rc::clone(&self.environment));
                        scope.define(
                            "super",
                            Value::Callable(Callable::Class(Rc::clone(superclass))),
                        );
                        scope.into_ref()
                    }
                    None => Rc::clone(&self.environment),
                };

                let methods = methods
                    .iter()
                    .map(|method| {
                        let function = LoxFunction::new(
                            Rc::clone(method),
                            Rc::clone(&method_scope),
                            method.name.lexeme == "init",
                        );
                        (method.name.lexeme.clone(), Rc::new(function))
                    })
                    .collect();

                let class = LoxClass::new(name.lexeme.clone(), superclass, methods);
                self.environment.borrow_mut().assign(
                    name,
                    Value::Callable(Callable::Class(Rc::new(class))),
                )?;
            }
        }

        Ok(())
    }

    /// Run `statements` inside `environment`, restoring the current scope on
    /// every exit path.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Exec<()> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, environment);

        let result: Exec<()> = statements.iter().try_for_each(|stmt| self.execute(stmt));

        self.environment = previous;

        result
    }

    // ──────────────────────────── expressions ──────────────────────────────

    fn evaluate(&mut self, expr: &Expr) -> Exec<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right: Value = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(LoxError::runtime(operator, "Operand must be a number.").into()),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(LoxError::runtime(operator, "Invalid unary operator.").into()),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;

                Ok(binary(operator, left, right)?)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                let short_circuit: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => Ok(self.look_up_variable(*id, name)?),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                let Value::Callable(callable) = callee else {
                    return Err(
                        LoxError::runtime(paren, "Can only call functions and classes.").into(),
                    );
                };

                if values.len() != callable.arity() {
                    return Err(LoxError::runtime(
                        paren,
                        format!(
                            "Expected {} arguments but got {}.",
                            callable.arity(),
                            values.len()
                        ),
                    )
                    .into());
                }

                callable.call(self, paren, values)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Ok(LoxInstance::get(&instance, name)?),
                _ => Err(LoxError::runtime(name, "Only instances have properties.").into()),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name, "Only instances have fields.").into());
                };

                let value: Value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());

                Ok(value)
            }

            Expr::This { id, keyword } => Ok(self.look_up_variable(*id, keyword)?),

            Expr::Super {
                id,
                keyword,
                method,
            } => Ok(self.evaluate_super(*id, keyword, method)?),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    /// `super.method`: find `method` starting at the superclass of the class
    /// whose method is running, then bind it to the current `this`.
    fn evaluate_super(&self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let undefined =
            || LoxError::runtime(method, format!("Undefined property '{}'.", method.lexeme));

        let distance: usize = *self
            .locals
            .get(&id)
            .ok_or_else(|| LoxError::runtime(keyword, "Can't use 'super' outside of a class."))?;

        let Value::Callable(Callable::Class(superclass)) =
            Environment::get_at(&self.environment, distance, keyword)?
        else {
            return Err(LoxError::runtime(keyword, "Superclass must be a class."));
        };

        // `this` always lives in the scope just inside the one binding `super`.
        let this_scope: Option<EnvRef> =
            Environment::ancestor(&self.environment, distance.saturating_sub(1));
        let instance: Option<Value> = match &this_scope {
            Some(scope) => scope.borrow().get_here("this"),
            None => None,
        };

        let Some(Value::Instance(instance)) = instance else {
            return Err(undefined());
        };

        let method: Rc<LoxFunction> = superclass.find_method(&method.lexeme).ok_or_else(undefined)?;

        Ok(Value::Callable(Callable::Function(Rc::new(
            method.bind(instance),
        ))))
    }
}

/// Arithmetic, comparison and equality on two evaluated operands.
fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    let numbers = || match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
    };

    let value: Value = match operator.token_type {
        TokenType::PLUS => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::String(a), Value::String(b)) => Value::String(format!("{}{}", a, b)),
            _ => {
                return Err(LoxError::runtime(
                    operator,
                    "Operands must be two numbers or two strings.",
                ))
            }
        },
        TokenType::MINUS => {
            let (a, b) = numbers()?;
            Value::Number(a - b)
        }
        TokenType::STAR => {
            let (a, b) = numbers()?;
            Value::Number(a * b)
        }
        TokenType::SLASH => {
            let (a, b) = numbers()?;
            Value::Number(a / b)
        }
        TokenType::GREATER => {
            let (a, b) = numbers()?;
            Value::Bool(a > b)
        }
        TokenType::GREATER_EQUAL => {
            let (a, b) = numbers()?;
            Value::Bool(a >= b)
        }
        TokenType::LESS => {
            let (a, b) = numbers()?;
            Value::Bool(a < b)
        }
        TokenType::LESS_EQUAL => {
            let (a, b) = numbers()?;
            Value::Bool(a <= b)
        }
        TokenType::EQUAL_EQUAL => Value::Bool(left == right),
        TokenType::BANG_EQUAL => Value::Bool(left != right),
        _ => return Err(LoxError::runtime(operator, "Invalid binary operator.")),
    };

    Ok(value)
}
