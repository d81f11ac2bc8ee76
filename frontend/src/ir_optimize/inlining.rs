//! Inlining means replacing a call of a user-defined function with a copy of
//! its body.
//!
//! Here's a before-and-after example:
//!
//! ```ingot
//! # before:
//! {
//!     let y := double(7)
//! }
//! function double(a) -> r {
//!     r := add(a, a)
//! }
//!
//! # after:
//! {
//!     let double_a := 7
//!     let double_r
//!     {
//!         double_r := add(double_a, double_a)
//!     }
//!     let y := double_r
//! }
//! function double(a) -> r {
//!     r := add(a, a)
//! }
//! ```
//!
//! A call is replaced when the callee has exactly one return variable and the
//! call site is not inside the callee's own body. The replacement consists of
//! a declaration of a fresh variable standing in for the return variable,
//! followed by a copy of the callee's body in which parameters are
//! substituted by the argument values and every declared name is replaced by
//! a fresh one. Ingot has one flat namespace, so freshness is global: a name
//! never collides with any name that exists anywhere else in the program.
//!
//! Because the copied body runs before the statement containing the call,
//! arguments can no longer be evaluated at the position of the call itself.
//! Whenever one argument's rewrite hoists statements out, the surrounding
//! arguments are pinned into temporaries so that the left-to-right
//! evaluation order of the original program is kept intact.
//!
//! Callees are normalized before their first copy is taken, so a body is
//! never re-expanded after it was spliced somewhere. A function calling
//! itself is left alone at that call site; that guard stops one-step
//! self-expansion only. A cycle through other functions (`f` calls `g` calls
//! `f`) is not detected: the function that is still in flight is copied in
//! the state the registry last saw, which is its not-yet-normalized body.

use crate::{
    ir::{Block, Expression, FunctionDefinition, Program, Statement, TypedName},
    name::NameDispenser,
    utils::HashMapExtension,
};
use itertools::Itertools;
use rustc_hash::{FxHashMap, FxHashSet};
use std::mem;

impl Program {
    /// Replaces every eligible call in the program, mutating it in place.
    pub fn inline_functions(&mut self) {
        let body = mem::take(&mut self.body);
        self.body = FullInliner::new(body).run();
    }
}

/// Drives inlining over one program.
///
/// The driver owns the tree for the duration of the pass. On construction it
/// pulls the function definitions out of the top-level block into a registry
/// and seeds the name dispenser with every name the program contains; `run`
/// rewrites the prologue and then every function body, and reinstalls the
/// definitions in their original order.
pub struct FullInliner {
    /// The top-level block. While the pass runs, only the prologue
    /// statements live here; the function definitions are in `functions`.
    ast: Block,
    functions: FxHashMap<String, FunctionDefinition>,
    /// Function names in declaration order. Used to reinstall the
    /// definitions and to drain `functions_to_visit` deterministically.
    function_order: Vec<String>,
    /// Functions whose body has not been normalized yet. A function leaves
    /// this set exactly once, right before its body is processed, and never
    /// returns. Removing it first is what keeps a self-calling function from
    /// being processed forever.
    functions_to_visit: FxHashSet<String>,
    name_dispenser: NameDispenser,
}

impl FullInliner {
    pub fn new(mut ast: Block) -> Self {
        let name_dispenser = NameDispenser::new(ast.all_names());

        let mut functions = FxHashMap::default();
        let mut function_order = vec![];
        let mut functions_to_visit = FxHashSet::default();
        for statement in mem::take(&mut ast.statements) {
            match statement {
                Statement::FunctionDefinition(function) => {
                    function_order.push(function.name.clone());
                    functions_to_visit.insert(function.name.clone());
                    functions.force_insert(function.name.clone(), function);
                }
                statement => ast.statements.push(statement),
            }
        }

        Self {
            ast,
            functions,
            function_order,
            functions_to_visit,
            name_dispenser,
        }
    }

    pub fn run(mut self) -> Block {
        let mut statements = mem::take(&mut self.ast.statements);
        for statement in &mut statements {
            let Statement::Block(block) = statement else {
                panic!(
                    "Invalid top-level statement. Inlining requires the function hoister and grouper to run first."
                );
            };
            InlineModifier::new(&mut self, None).visit_block(block);
        }
        self.ast.statements = statements;

        for name in self.function_order.clone() {
            self.handle_function(&name);
        }

        for name in &self.function_order {
            let function = self.functions.remove(name).unwrap();
            self.ast
                .statements
                .push(Statement::FunctionDefinition(function));
        }
        self.ast
    }

    /// Normalizes the given function's body: every eligible call inside it
    /// is inlined. Does nothing if the body was already processed or is
    /// being processed right now.
    fn handle_function(&mut self, name: &str) {
        if !self.functions_to_visit.remove(name) {
            return;
        }
        // The body is rewritten on a clone so that the function stays
        // visible in the registry while it is in flight; signature lookups
        // for calls to it (including its own self-calls) keep working.
        let mut body = self.functions[name].body.clone();
        InlineModifier::new(self, Some(name.to_string())).visit_block(&mut body);
        self.functions.get_mut(name).unwrap().body = body;
    }

    fn function(&self, name: &str) -> &FunctionDefinition {
        self.functions.get(name).unwrap_or_else(|| {
            panic!("Call to function `{name}` which is not defined at the top level.")
        })
    }
}

/// Rewrites one block in the context of a fixed enclosing function (`None`
/// while rewriting the top-level prologue, where no self-call restriction
/// applies).
struct InlineModifier<'a> {
    driver: &'a mut FullInliner,
    current_function: Option<String>,
    /// Statements that have to be spliced into the enclosing block right
    /// before the statement currently being visited.
    statements_to_prefix: Vec<Statement>,
}

impl<'a> InlineModifier<'a> {
    fn new(driver: &'a mut FullInliner, current_function: Option<String>) -> Self {
        Self {
            driver,
            current_function,
            statements_to_prefix: vec![],
        }
    }

    fn visit_block(&mut self, block: &mut Block) {
        let statements = mem::take(&mut block.statements);
        for mut statement in statements {
            self.visit_statement(&mut statement);
            // Everything the statement's rewrite hoisted out has to execute
            // before the statement itself.
            block.statements.append(&mut self.statements_to_prefix);
            block.statements.push(statement);
        }
    }

    fn visit_statement(&mut self, statement: &mut Statement) {
        match statement {
            Statement::Expression(expression) => self.visit_expression(expression),
            Statement::VariableDeclaration { value, .. } => {
                if let Some(value) = value {
                    self.visit_expression(value);
                }
            }
            Statement::Assignment { value, .. } => self.visit_expression(value),
            Statement::Block(block) => self.visit_block(block),
            Statement::ForLoop {
                pre, post, body, ..
            } => {
                // The condition is not visited: statements hoisted out of it
                // would have to run before every iteration's test, and no
                // statement position means that. Calls in the condition
                // simply stay calls.
                self.visit_block(pre);
                self.visit_block(post);
                self.visit_block(body);
            }
            Statement::FunctionDefinition(function) => {
                panic!(
                    "Function `{}` is defined below the top level. The function hoister has to run before inlining.",
                    function.name,
                );
            }
        }
    }

    fn visit_expression(&mut self, expression: &mut Expression) {
        let replacement = match expression {
            Expression::Literal { .. } | Expression::Identifier { .. } => None,
            Expression::Instruction { arguments, .. } => {
                self.visit_arguments(arguments, &[], &[], false);
                None
            }
            Expression::Call {
                function,
                arguments,
            } => {
                let function = function.clone();
                self.visit_call(&function, arguments)
            }
        };
        if let Some(replacement) = replacement {
            *expression = replacement;
        }
    }

    /// Rewrites one call. Returns the expression the call has to be replaced
    /// with, or `None` if the call stays (its arguments may have been
    /// rewritten regardless).
    fn visit_call(
        &mut self,
        function_name: &str,
        arguments: &mut Vec<Expression>,
    ) -> Option<Expression> {
        // Normalize the callee first, so that the copy spliced below is
        // itself already fully inlined and never has to be processed again.
        self.driver.handle_function(function_name);

        let function = self.driver.function(function_name).clone();

        let mut do_inline = self.current_function.as_deref() != Some(function_name);
        if function.return_variables.len() != 1 {
            do_inline = false;
        }

        let name_hints = function
            .parameters
            .iter()
            .map(|parameter| format!("{}_{}", function.name, parameter.name))
            .collect_vec();
        let types = function
            .parameters
            .iter()
            .map(|parameter| parameter.ty.clone())
            .collect_vec();
        self.visit_arguments(arguments, &name_hints, &types, do_inline);

        if !do_inline {
            return None;
        }

        assert_eq!(
            arguments.len(),
            function.parameters.len(),
            "Call to function `{}` with a wrong number of arguments.",
            function.name,
        );
        let mut replacements: FxHashMap<String, String> = function
            .parameters
            .iter()
            .zip(arguments.iter())
            .map(|(parameter, argument)| {
                let Expression::Identifier { name } = argument else {
                    panic!(
                        "An argument of the call to `{}` was not reduced to an identifier.",
                        function.name,
                    );
                };
                (parameter.name.clone(), name.clone())
            })
            .collect();
        let return_variable = &function.return_variables[0];
        let result_name = self.new_name(&format!("{}_{}", function.name, return_variable.name));
        replacements.insert(return_variable.name.clone(), result_name.clone());

        self.statements_to_prefix.push(Statement::VariableDeclaration {
            variables: vec![TypedName {
                name: result_name.clone(),
                ty: return_variable.ty.clone(),
            }],
            value: None,
        });
        let body = BodyCopier::new(
            &mut self.driver.name_dispenser,
            format!("{}_", function.name),
            replacements,
        )
        .copy(&function.body);
        self.statements_to_prefix.push(Statement::Block(body));

        Some(Expression::Identifier { name: result_name })
    }

    /// Visits `arguments` left to right, moving everything their rewrites
    /// hoist out in front of the enclosing statement without changing the
    /// order in which the arguments are evaluated.
    ///
    /// As soon as one argument expands into prefix statements, its
    /// evaluation no longer happens at the call. Plain-identifier arguments
    /// to its left are then pinned into temporaries ahead of that prefix,
    /// and every following argument is pinned as well, so no argument is
    /// ever evaluated out of order. When the call itself is going to be
    /// inlined, `move_to_front` starts out `true` and all arguments end up
    /// as plain identifiers.
    fn visit_arguments(
        &mut self,
        arguments: &mut [Expression],
        name_hints: &[String],
        types: &[String],
        mut move_to_front: bool,
    ) {
        let mut prefix: Vec<Statement> = vec![];
        for index in 0..arguments.len() {
            let internal_prefix = self.visit_recursively(&mut arguments[index]);
            if !internal_prefix.is_empty() {
                if !move_to_front {
                    move_to_front = true;
                    for earlier in 0..index {
                        if matches!(arguments[earlier], Expression::Identifier { .. }) {
                            let declaration = self.hoist_argument(
                                &mut arguments[earlier],
                                earlier,
                                name_hints,
                                types,
                            );
                            prefix.push(declaration);
                        }
                    }
                }
                prefix.extend(internal_prefix);
            } else if move_to_front {
                let declaration =
                    self.hoist_argument(&mut arguments[index], index, name_hints, types);
                prefix.push(declaration);
            }
        }
        self.statements_to_prefix.append(&mut prefix);
    }

    /// Binds the argument to a fresh temporary and replaces it with a
    /// reference to that temporary.
    fn hoist_argument(
        &mut self,
        argument: &mut Expression,
        index: usize,
        name_hints: &[String],
        types: &[String],
    ) -> Statement {
        let name = self.new_name(name_hints.get(index).map_or("", String::as_str));
        let value = mem::replace(argument, Expression::Identifier { name: name.clone() });
        Statement::VariableDeclaration {
            variables: vec![TypedName {
                name,
                ty: types.get(index).cloned().unwrap_or_default(),
            }],
            value: Some(value),
        }
    }

    /// Visits the expression with an empty pending buffer and hands back
    /// whatever the visit wanted to splice, leaving the outer buffer as it
    /// was.
    fn visit_recursively(&mut self, expression: &mut Expression) -> Vec<Statement> {
        let saved = mem::take(&mut self.statements_to_prefix);
        self.visit_expression(expression);
        mem::replace(&mut self.statements_to_prefix, saved)
    }

    fn new_name(&mut self, prefix: &str) -> String {
        self.driver.name_dispenser.new_name(prefix)
    }
}

/// Deep-copies a function body, giving every declared name a fresh
/// globally-unique replacement and rewriting every identifier through the
/// active substitution.
struct BodyCopier<'a> {
    name_dispenser: &'a mut NameDispenser,
    name_prefix: String,
    replacements: FxHashMap<String, String>,
}

impl<'a> BodyCopier<'a> {
    fn new(
        name_dispenser: &'a mut NameDispenser,
        name_prefix: String,
        replacements: FxHashMap<String, String>,
    ) -> Self {
        Self {
            name_dispenser,
            name_prefix,
            replacements,
        }
    }

    fn copy(mut self, body: &Block) -> Block {
        let mut body = body.clone();
        self.walk_block(&mut body);
        body
    }

    fn walk_block(&mut self, block: &mut Block) {
        for statement in &mut block.statements {
            self.walk_statement(statement);
        }
    }

    fn walk_statement(&mut self, statement: &mut Statement) {
        match statement {
            Statement::Expression(expression) => self.walk_expression(expression),
            Statement::VariableDeclaration { variables, value } => {
                // The declared names are renamed before the initializer is
                // rewritten; the extended mapping is already active inside
                // it and for the rest of the copy.
                for variable in variables.iter_mut() {
                    let hint = format!("{}{}", self.name_prefix, variable.name);
                    let replacement = self.name_dispenser.new_name(&hint);
                    self.replacements
                        .insert(variable.name.clone(), replacement.clone());
                    variable.name = replacement;
                }
                if let Some(value) = value {
                    self.walk_expression(value);
                }
            }
            Statement::Assignment { targets, value } => {
                for target in targets.iter_mut() {
                    self.translate(target);
                }
                self.walk_expression(value);
            }
            Statement::Block(block) => self.walk_block(block),
            Statement::ForLoop {
                pre,
                condition,
                post,
                body,
            } => {
                self.walk_block(pre);
                self.walk_expression(condition);
                self.walk_block(post);
                self.walk_block(body);
            }
            Statement::FunctionDefinition(function) => {
                panic!(
                    "Function `{}` is defined below the top level. The function hoister has to run before inlining.",
                    function.name,
                );
            }
        }
    }

    fn walk_expression(&mut self, expression: &mut Expression) {
        match expression {
            Expression::Literal { .. } => {}
            Expression::Identifier { name } => self.translate(name),
            Expression::Call {
                function,
                arguments,
            } => {
                self.translate(function);
                for argument in arguments {
                    self.walk_expression(argument);
                }
            }
            Expression::Instruction { arguments, .. } => {
                for argument in arguments {
                    self.walk_expression(argument);
                }
            }
        }
    }

    fn translate(&self, name: &mut String) {
        if let Some(replacement) = self.replacements.get(name) {
            *name = replacement.clone();
        }
    }
}

#[cfg(test)]
use crate::ir::BlockBuilder;

#[cfg(test)]
fn push_identity_function(
    body: &mut BlockBuilder,
    name: &str,
    parameter: &str,
    return_variable: &str,
) {
    body.push_function(name, |function| {
        function.parameter(parameter);
        function.return_variable(return_variable);
        function.push_assignment(&[return_variable], Expression::identifier(parameter));
    });
}

#[test]
fn test_calls_to_single_return_functions_are_inlined() {
    // { let y := f(1) }
    // function f(a) -> r { r := a }
    //
    // # becomes:
    // {
    //     let f_a := 1
    //     let f_r
    //     { f_r := f_a }
    //     let y := f_r
    // }
    // function f(a) -> r { r := a }
    let mut program = Program::build(|body| {
        body.push_block(|block| {
            block.push_declaration("y", Expression::call("f", vec![Expression::number("1")]));
        });
        push_identity_function(body, "f", "a", "r");
    });
    program.inline_functions();
    assert_eq!(
        program,
        Program::build(|body| {
            body.push_block(|block| {
                block.push_declaration("f_a", Expression::number("1"));
                block.push_declaration("f_r", None);
                block.push_block(|copy| {
                    copy.push_assignment(&["f_r"], Expression::identifier("f_a"));
                });
                block.push_declaration("y", Expression::identifier("f_r"));
            });
            push_identity_function(body, "f", "a", "r");
        }),
    );
}

#[test]
fn test_argument_evaluation_order_is_preserved() {
    // Inlining the first argument moves its evaluation in front of the
    // statement, so the second argument has to move as well, into a
    // temporary bound after the first argument's expansion.
    let mut program = Program::build(|body| {
        body.push_block(|block| {
            block.push_declaration(
                "y",
                Expression::call(
                    "g",
                    vec![
                        Expression::call("f", vec![Expression::number("1")]),
                        Expression::number("2"),
                    ],
                ),
            );
        });
        push_identity_function(body, "f", "a", "r");
        body.push_function("g", |function| {
            function.parameter("b");
            function.parameter("c");
            function.return_variable("s");
            function.push_assignment(&["s"], Expression::identifier("b"));
        });
    });
    program.inline_functions();
    assert_eq!(
        program,
        Program::build(|body| {
            body.push_block(|block| {
                block.push_declaration("f_a", Expression::number("1"));
                block.push_declaration("f_r", None);
                block.push_block(|copy| {
                    copy.push_assignment(&["f_r"], Expression::identifier("f_a"));
                });
                block.push_declaration("g_c", Expression::number("2"));
                block.push_declaration("g_s", None);
                block.push_block(|copy| {
                    copy.push_assignment(&["g_s"], Expression::identifier("f_r"));
                });
                block.push_declaration("y", Expression::identifier("g_s"));
            });
            push_identity_function(body, "f", "a", "r");
            body.push_function("g", |function| {
                function.parameter("b");
                function.parameter("c");
                function.return_variable("s");
                function.push_assignment(&["s"], Expression::identifier("b"));
            });
        }),
    );
}

#[test]
fn test_calls_to_multi_return_functions_stay() {
    let input = Program::build(|body| {
        body.push_block(|block| {
            block.push_declarations(
                &["u", "v"],
                Expression::call("pair", vec![Expression::number("7")]),
            );
        });
        body.push_function("pair", |function| {
            function.parameter("p");
            function.return_variable("s");
            function.return_variable("t");
            function.push_assignment(&["s"], Expression::identifier("p"));
            function.push_assignment(&["t"], Expression::identifier("p"));
        });
    });
    let mut program = input.clone();
    program.inline_functions();
    assert_eq!(program, input);
}

#[test]
fn test_calls_to_functions_without_return_variables_stay() {
    let input = Program::build(|body| {
        body.push_block(|block| {
            block.push_expression(Expression::call("log", vec![Expression::number("7")]));
        });
        body.push_function("log", |function| {
            function.parameter("p");
        });
    });
    let mut program = input.clone();
    program.inline_functions();
    assert_eq!(program, input);
}

#[test]
fn test_arguments_of_calls_that_stay_are_still_rewritten() {
    // `pair` itself is not inlinable, but the `f(1)` in its argument list
    // is, and the expansion has to land in front of the statement.
    let mut program = Program::build(|body| {
        body.push_block(|block| {
            block.push_declarations(
                &["u", "v"],
                Expression::call(
                    "pair",
                    vec![Expression::call("f", vec![Expression::number("1")])],
                ),
            );
        });
        body.push_function("pair", |function| {
            function.parameter("p");
            function.return_variable("s");
            function.return_variable("t");
            function.push_assignment(&["s"], Expression::identifier("p"));
            function.push_assignment(&["t"], Expression::identifier("p"));
        });
        push_identity_function(body, "f", "a", "r");
    });
    program.inline_functions();
    assert_eq!(
        program,
        Program::build(|body| {
            body.push_block(|block| {
                block.push_declaration("f_a", Expression::number("1"));
                block.push_declaration("f_r", None);
                block.push_block(|copy| {
                    copy.push_assignment(&["f_r"], Expression::identifier("f_a"));
                });
                block.push_declarations(
                    &["u", "v"],
                    Expression::call("pair", vec![Expression::identifier("f_r")]),
                );
            });
            body.push_function("pair", |function| {
                function.parameter("p");
                function.return_variable("s");
                function.return_variable("t");
                function.push_assignment(&["s"], Expression::identifier("p"));
                function.push_assignment(&["t"], Expression::identifier("p"));
            });
            push_identity_function(body, "f", "a", "r");
        }),
    );
}

#[test]
fn test_self_calls_are_not_inlined() {
    // The call to `f` inside `f`'s own body stays; the copy of the body
    // spliced at the outer call site keeps it as a call too.
    let mut program = Program::build(|body| {
        body.push_block(|block| {
            block.push_declaration("y", Expression::call("f", vec![]));
        });
        body.push_function("f", |function| {
            function.return_variable("x");
            function.push_assignment(&["x"], Expression::call("f", vec![]));
        });
    });
    program.inline_functions();
    assert_eq!(
        program,
        Program::build(|body| {
            body.push_block(|block| {
                block.push_declaration("f_x", None);
                block.push_block(|copy| {
                    copy.push_assignment(&["f_x"], Expression::call("f", vec![]));
                });
                block.push_declaration("y", Expression::identifier("f_x"));
            });
            body.push_function("f", |function| {
                function.return_variable("x");
                function.push_assignment(&["x"], Expression::call("f", vec![]));
            });
        }),
    );
}

#[test]
fn test_for_loop_conditions_are_left_alone() {
    // Calls in the pre block, post block, and body are inlined; the call in
    // the condition stays a call, untouched arguments and all.
    let mut program = Program::build(|body| {
        body.push_block(|block| {
            block.push_for_loop(
                |pre| {
                    pre.push_declaration("i", Expression::call("f", vec![Expression::number("1")]));
                },
                Expression::call("f", vec![Expression::identifier("i")]),
                |post| {
                    post.push_assignment(
                        &["i"],
                        Expression::call("f", vec![Expression::number("2")]),
                    );
                },
                |loop_body| {
                    loop_body.push_declaration(
                        "q",
                        Expression::call("f", vec![Expression::number("3")]),
                    );
                },
            );
        });
        push_identity_function(body, "f", "a", "r");
    });
    program.inline_functions();
    assert_eq!(
        program,
        Program::build(|body| {
            body.push_block(|block| {
                block.push_for_loop(
                    |pre| {
                        pre.push_declaration("f_a", Expression::number("1"));
                        pre.push_declaration("f_r", None);
                        pre.push_block(|copy| {
                            copy.push_assignment(&["f_r"], Expression::identifier("f_a"));
                        });
                        pre.push_declaration("i", Expression::identifier("f_r"));
                    },
                    Expression::call("f", vec![Expression::identifier("i")]),
                    |post| {
                        post.push_declaration("f_a_1", Expression::number("2"));
                        post.push_declaration("f_r_1", None);
                        post.push_block(|copy| {
                            copy.push_assignment(&["f_r_1"], Expression::identifier("f_a_1"));
                        });
                        post.push_assignment(&["i"], Expression::identifier("f_r_1"));
                    },
                    |loop_body| {
                        loop_body.push_declaration("f_a_2", Expression::number("3"));
                        loop_body.push_declaration("f_r_2", None);
                        loop_body.push_block(|copy| {
                            copy.push_assignment(&["f_r_2"], Expression::identifier("f_a_2"));
                        });
                        loop_body.push_declaration("q", Expression::identifier("f_r_2"));
                    },
                );
            });
            push_identity_function(body, "f", "a", "r");
        }),
    );
}

#[test]
fn test_callees_are_normalized_before_they_are_copied() {
    // `g` calls `f`. By the time `g` is copied into the prologue, the call
    // to `f` inside it is already expanded, so the copy never needs another
    // pass.
    let mut program = Program::build(|body| {
        body.push_block(|block| {
            block.push_declaration("y", Expression::call("g", vec![]));
        });
        body.push_function("g", |function| {
            function.return_variable("s");
            function.push_assignment(
                &["s"],
                Expression::call("f", vec![Expression::number("1")]),
            );
        });
        push_identity_function(body, "f", "a", "r");
    });
    program.inline_functions();
    assert_eq!(
        program,
        Program::build(|body| {
            body.push_block(|block| {
                block.push_declaration("g_s", None);
                block.push_block(|copy| {
                    copy.push_declaration("g_f_a", Expression::number("1"));
                    copy.push_declaration("g_f_r", None);
                    copy.push_block(|inner| {
                        inner.push_assignment(&["g_f_r"], Expression::identifier("g_f_a"));
                    });
                    copy.push_assignment(&["g_s"], Expression::identifier("g_f_r"));
                });
                block.push_declaration("y", Expression::identifier("g_s"));
            });
            body.push_function("g", |function| {
                function.return_variable("s");
                function.push_declaration("f_a", Expression::number("1"));
                function.push_declaration("f_r", None);
                function.push_block(|copy| {
                    copy.push_assignment(&["f_r"], Expression::identifier("f_a"));
                });
                function.push_assignment(&["s"], Expression::identifier("f_r"));
            });
            push_identity_function(body, "f", "a", "r");
        }),
    );
}

#[test]
fn test_function_bodies_are_processed_without_a_prologue() {
    let mut program = Program::build(|body| {
        body.push_function("g", |function| {
            function.return_variable("s");
            function.push_assignment(
                &["s"],
                Expression::call("f", vec![Expression::number("1")]),
            );
        });
        push_identity_function(body, "f", "a", "r");
    });
    program.inline_functions();
    assert_eq!(
        program,
        Program::build(|body| {
            body.push_function("g", |function| {
                function.return_variable("s");
                function.push_declaration("f_a", Expression::number("1"));
                function.push_declaration("f_r", None);
                function.push_block(|copy| {
                    copy.push_assignment(&["f_r"], Expression::identifier("f_a"));
                });
                function.push_assignment(&["s"], Expression::identifier("f_r"));
            });
            push_identity_function(body, "f", "a", "r");
        }),
    );
}

#[test]
fn test_identifiers_left_of_an_expanding_argument_are_pinned() {
    // The self-call `f(a, g(b))` is not inlined, but expanding `g(b)` moves
    // its evaluation in front of the statement. Reading `a` has to stay
    // ahead of that expansion, so `a` is pinned into a temporary first.
    let mut program = Program::build(|body| {
        body.push_function("f", |function| {
            function.parameter("a");
            function.parameter("b");
            function.return_variable("r");
            function.push_assignment(
                &["r"],
                Expression::call(
                    "f",
                    vec![
                        Expression::identifier("a"),
                        Expression::call("g", vec![Expression::identifier("b")]),
                    ],
                ),
            );
        });
        push_identity_function(body, "g", "p", "q");
    });
    program.inline_functions();
    assert_eq!(
        program,
        Program::build(|body| {
            body.push_function("f", |function| {
                function.parameter("a");
                function.parameter("b");
                function.return_variable("r");
                function.push_declaration("f_a", Expression::identifier("a"));
                function.push_declaration("g_p", Expression::identifier("b"));
                function.push_declaration("g_q", None);
                function.push_block(|copy| {
                    copy.push_assignment(&["g_q"], Expression::identifier("g_p"));
                });
                function.push_assignment(
                    &["r"],
                    Expression::call(
                        "f",
                        vec![
                            Expression::identifier("f_a"),
                            Expression::identifier("g_q"),
                        ],
                    ),
                );
            });
            push_identity_function(body, "g", "p", "q");
        }),
    );
}

#[test]
fn test_instruction_operands_are_hoisted_like_arguments() {
    // Instructions are never inlined themselves, but calls in their operand
    // list are. The identifier operand to the left gets pinned without a
    // name hint, so it receives a purely numeric fresh name.
    let mut program = Program::build(|body| {
        body.push_block(|block| {
            block.push_declaration("x", Expression::number("1"));
            block.push_expression(Expression::instruction(
                "mstore",
                vec![
                    Expression::identifier("x"),
                    Expression::call("f", vec![Expression::number("2")]),
                ],
            ));
        });
        push_identity_function(body, "f", "a", "r");
    });
    program.inline_functions();
    assert_eq!(
        program,
        Program::build(|body| {
            body.push_block(|block| {
                block.push_declaration("x", Expression::number("1"));
                block.push_declaration("_1", Expression::identifier("x"));
                block.push_declaration("f_a", Expression::number("2"));
                block.push_declaration("f_r", None);
                block.push_block(|copy| {
                    copy.push_assignment(&["f_r"], Expression::identifier("f_a"));
                });
                block.push_expression(Expression::instruction(
                    "mstore",
                    vec![
                        Expression::identifier("_1"),
                        Expression::identifier("f_r"),
                    ],
                ));
            });
            push_identity_function(body, "f", "a", "r");
        }),
    );
}

#[test]
fn test_generated_names_avoid_names_that_already_exist() {
    // The program already contains a `f_r`, so the fresh name for the
    // return variable falls back to the first free numeric suffix.
    let mut program = Program::build(|body| {
        body.push_block(|block| {
            block.push_declaration("f_r", Expression::number("7"));
            block.push_declaration("y", Expression::call("f", vec![Expression::identifier("f_r")]));
        });
        push_identity_function(body, "f", "a", "r");
    });
    program.inline_functions();
    assert_eq!(
        program,
        Program::build(|body| {
            body.push_block(|block| {
                block.push_declaration("f_r", Expression::number("7"));
                block.push_declaration("f_a", Expression::identifier("f_r"));
                block.push_declaration("f_r_1", None);
                block.push_block(|copy| {
                    copy.push_assignment(&["f_r_1"], Expression::identifier("f_a"));
                });
                block.push_declaration("y", Expression::identifier("f_r_1"));
            });
            push_identity_function(body, "f", "a", "r");
        }),
    );
}

#[test]
fn test_declarations_in_copied_bodies_are_renamed() {
    let mut program = Program::build(|body| {
        body.push_block(|block| {
            block.push_declaration("y", Expression::call("f", vec![Expression::number("1")]));
        });
        body.push_function("f", |function| {
            function.parameter("a");
            function.return_variable("r");
            function.push_declaration("t", Expression::identifier("a"));
            function.push_assignment(&["r"], Expression::identifier("t"));
        });
    });
    program.inline_functions();
    assert_eq!(
        program,
        Program::build(|body| {
            body.push_block(|block| {
                block.push_declaration("f_a", Expression::number("1"));
                block.push_declaration("f_r", None);
                block.push_block(|copy| {
                    copy.push_declaration("f_t", Expression::identifier("f_a"));
                    copy.push_assignment(&["f_r"], Expression::identifier("f_t"));
                });
                block.push_declaration("y", Expression::identifier("f_r"));
            });
            body.push_function("f", |function| {
                function.parameter("a");
                function.return_variable("r");
                function.push_declaration("t", Expression::identifier("a"));
                function.push_assignment(&["r"], Expression::identifier("t"));
            });
        }),
    );
}

#[test]
fn test_conditions_in_copied_bodies_are_substituted() {
    // The rewrite never descends into loop conditions, but a copied body is
    // substituted wholesale, conditions included.
    let mut program = Program::build(|body| {
        body.push_block(|block| {
            block.push_declaration(
                "y",
                Expression::call("loopy", vec![Expression::number("5")]),
            );
        });
        body.push_function("loopy", |function| {
            function.parameter("a");
            function.return_variable("r");
            function.push_for_loop(
                |pre| pre.push_declaration("i", Expression::identifier("a")),
                Expression::instruction(
                    "lt",
                    vec![Expression::identifier("i"), Expression::identifier("a")],
                ),
                |post| post.push_assignment(&["i"], Expression::identifier("a")),
                |loop_body| loop_body.push_assignment(&["r"], Expression::identifier("i")),
            );
        });
    });
    program.inline_functions();
    assert_eq!(
        program,
        Program::build(|body| {
            body.push_block(|block| {
                block.push_declaration("loopy_a", Expression::number("5"));
                block.push_declaration("loopy_r", None);
                block.push_block(|copy| {
                    copy.push_for_loop(
                        |pre| pre.push_declaration("loopy_i", Expression::identifier("loopy_a")),
                        Expression::instruction(
                            "lt",
                            vec![
                                Expression::identifier("loopy_i"),
                                Expression::identifier("loopy_a"),
                            ],
                        ),
                        |post| post.push_assignment(&["loopy_i"], Expression::identifier("loopy_a")),
                        |loop_body| {
                            loop_body
                                .push_assignment(&["loopy_r"], Expression::identifier("loopy_i"));
                        },
                    );
                });
                block.push_declaration("y", Expression::identifier("loopy_r"));
            });
            body.push_function("loopy", |function| {
                function.parameter("a");
                function.return_variable("r");
                function.push_for_loop(
                    |pre| pre.push_declaration("i", Expression::identifier("a")),
                    Expression::instruction(
                        "lt",
                        vec![Expression::identifier("i"), Expression::identifier("a")],
                    ),
                    |post| post.push_assignment(&["i"], Expression::identifier("a")),
                    |loop_body| loop_body.push_assignment(&["r"], Expression::identifier("i")),
                );
            });
        }),
    );
}

#[test]
fn test_types_are_carried_to_generated_declarations() {
    let mut program = Program::build(|body| {
        body.push_block(|block| {
            block.push_declaration("y", Expression::call("wrap", vec![Expression::number("1")]));
        });
        body.push_function("wrap", |function| {
            function.typed_parameter("a", "word");
            function.typed_return_variable("r", "word");
            function.push_assignment(&["r"], Expression::identifier("a"));
        });
    });
    program.inline_functions();
    assert_eq!(
        program,
        Program::build(|body| {
            body.push_block(|block| {
                block.push(Statement::VariableDeclaration {
                    variables: vec![TypedName::with_type("wrap_a", "word")],
                    value: Some(Expression::number("1")),
                });
                block.push(Statement::VariableDeclaration {
                    variables: vec![TypedName::with_type("wrap_r", "word")],
                    value: None,
                });
                block.push_block(|copy| {
                    copy.push_assignment(&["wrap_r"], Expression::identifier("wrap_a"));
                });
                block.push_declaration("y", Expression::identifier("wrap_r"));
            });
            body.push_function("wrap", |function| {
                function.typed_parameter("a", "word");
                function.typed_return_variable("r", "word");
                function.push_assignment(&["r"], Expression::identifier("a"));
            });
        }),
    );
}

#[test]
fn test_each_prologue_block_gets_its_own_pass() {
    // Every top-level block is rewritten separately, but the dispenser is
    // shared, so names stay unique across them.
    let mut program = Program::build(|body| {
        body.push_block(|block| {
            block.push_declaration("y", Expression::call("f", vec![Expression::number("1")]));
        });
        body.push_block(|block| {
            block.push_declaration("z", Expression::call("f", vec![Expression::number("2")]));
        });
        push_identity_function(body, "f", "a", "r");
    });
    program.inline_functions();
    assert_eq!(
        program,
        Program::build(|body| {
            body.push_block(|block| {
                block.push_declaration("f_a", Expression::number("1"));
                block.push_declaration("f_r", None);
                block.push_block(|copy| {
                    copy.push_assignment(&["f_r"], Expression::identifier("f_a"));
                });
                block.push_declaration("y", Expression::identifier("f_r"));
            });
            body.push_block(|block| {
                block.push_declaration("f_a_1", Expression::number("2"));
                block.push_declaration("f_r_1", None);
                block.push_block(|copy| {
                    copy.push_assignment(&["f_r_1"], Expression::identifier("f_a_1"));
                });
                block.push_declaration("z", Expression::identifier("f_r_1"));
            });
            push_identity_function(body, "f", "a", "r");
        }),
    );
}

#[test]
fn test_mutually_recursive_functions_do_not_explode() {
    // `f` and `g` call each other. While `f` is in flight, the registry
    // still holds its original body, so `g` splices that; afterwards `f`
    // splices `g`'s normalized body. The calls surviving inside the copies
    // are never revisited, so the pass terminates.
    let mut program = Program::build(|body| {
        body.push_function("f", |function| {
            function.return_variable("x");
            function.push_assignment(&["x"], Expression::call("g", vec![]));
        });
        body.push_function("g", |function| {
            function.return_variable("y");
            function.push_assignment(&["y"], Expression::call("f", vec![]));
        });
    });
    program.inline_functions();
    assert_eq!(
        program,
        Program::build(|body| {
            body.push_function("f", |function| {
                function.return_variable("x");
                function.push_declaration("g_y", None);
                function.push_block(|copy| {
                    copy.push_declaration("g_f_x", None);
                    copy.push_block(|inner| {
                        inner.push_assignment(&["g_f_x"], Expression::call("g", vec![]));
                    });
                    copy.push_assignment(&["g_y"], Expression::identifier("g_f_x"));
                });
                function.push_assignment(&["x"], Expression::identifier("g_y"));
            });
            body.push_function("g", |function| {
                function.return_variable("y");
                function.push_declaration("f_x", None);
                function.push_block(|copy| {
                    copy.push_assignment(&["f_x"], Expression::call("g", vec![]));
                });
                function.push_assignment(&["y"], Expression::identifier("f_x"));
            });
        }),
    );
}

#[test]
fn test_optimize_runs_inlining() {
    let mut program = Program::build(|body| {
        body.push_block(|block| {
            block.push_declaration("y", Expression::call("f", vec![Expression::number("1")]));
        });
        push_identity_function(body, "f", "a", "r");
    });
    let mut inlined = program.clone();
    inlined.inline_functions();
    program.optimize();
    assert_eq!(program, inlined);
}

#[test]
#[should_panic(expected = "not defined at the top level")]
fn test_calls_to_undefined_functions_panic() {
    let mut program = Program::build(|body| {
        body.push_block(|block| {
            block.push_declaration("y", Expression::call("f", vec![Expression::number("1")]));
        });
    });
    program.inline_functions();
}

#[test]
#[should_panic(expected = "Invalid top-level statement")]
fn test_non_block_top_level_statements_panic() {
    let mut program = Program::build(|body| {
        body.push_declaration("x", Expression::number("1"));
    });
    program.inline_functions();
}

#[test]
#[should_panic(expected = "below the top level")]
fn test_function_definitions_below_the_top_level_panic() {
    let mut program = Program::build(|body| {
        body.push_block(|block| {
            block.push_function("sneaky", |_| {});
        });
    });
    program.inline_functions();
}
