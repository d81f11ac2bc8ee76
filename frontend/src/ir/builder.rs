use super::{Block, Expression, FunctionDefinition, Statement, TypedName};
use derive_more::{Deref, DerefMut};

impl Block {
    pub fn build<F>(function: F) -> Self
    where
        F: FnOnce(&mut BlockBuilder),
    {
        let mut builder = BlockBuilder::default();
        function(&mut builder);
        builder.finish()
    }
}

#[derive(Default)]
pub struct BlockBuilder {
    statements: Vec<Statement>,
}

impl BlockBuilder {
    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn push_expression(&mut self, expression: Expression) {
        self.push(Statement::Expression(expression));
    }
    pub fn push_declaration(&mut self, name: &str, value: impl Into<Option<Expression>>) {
        self.push_declarations(&[name], value);
    }
    pub fn push_declarations(&mut self, names: &[&str], value: impl Into<Option<Expression>>) {
        self.push(Statement::VariableDeclaration {
            variables: names.iter().map(|name| TypedName::new(*name)).collect(),
            value: value.into(),
        });
    }
    pub fn push_assignment(&mut self, targets: &[&str], value: Expression) {
        self.push(Statement::Assignment {
            targets: targets.iter().map(|target| (*target).to_string()).collect(),
            value,
        });
    }
    pub fn push_block<F>(&mut self, function: F)
    where
        F: FnOnce(&mut Self),
    {
        self.push(Statement::Block(Block::build(function)));
    }
    pub fn push_for_loop<Pre, Post, Body>(
        &mut self,
        pre: Pre,
        condition: Expression,
        post: Post,
        body: Body,
    ) where
        Pre: FnOnce(&mut Self),
        Post: FnOnce(&mut Self),
        Body: FnOnce(&mut Self),
    {
        self.push(Statement::ForLoop {
            pre: Block::build(pre),
            condition,
            post: Block::build(post),
            body: Block::build(body),
        });
    }
    pub fn push_function<F>(&mut self, name: &str, function: F)
    where
        F: FnOnce(&mut FunctionBuilder),
    {
        let mut builder = FunctionBuilder::new(name);
        function(&mut builder);
        self.push(Statement::FunctionDefinition(builder.finish()));
    }

    pub fn finish(self) -> Block {
        Block {
            statements: self.statements,
        }
    }
}

#[derive(Deref, DerefMut)]
pub struct FunctionBuilder {
    #[deref]
    #[deref_mut]
    body_builder: BlockBuilder,
    name: String,
    parameters: Vec<TypedName>,
    return_variables: Vec<TypedName>,
}

impl FunctionBuilder {
    fn new(name: &str) -> Self {
        Self {
            body_builder: BlockBuilder::default(),
            name: name.to_string(),
            parameters: vec![],
            return_variables: vec![],
        }
    }

    pub fn parameter(&mut self, name: &str) {
        self.parameters.push(TypedName::new(name));
    }
    pub fn typed_parameter(&mut self, name: &str, ty: &str) {
        self.parameters.push(TypedName::with_type(name, ty));
    }
    pub fn return_variable(&mut self, name: &str) {
        self.return_variables.push(TypedName::new(name));
    }
    pub fn typed_return_variable(&mut self, name: &str, ty: &str) {
        self.return_variables.push(TypedName::with_type(name, ty));
    }

    fn finish(self) -> FunctionDefinition {
        FunctionDefinition {
            name: self.name,
            parameters: self.parameters,
            return_variables: self.return_variables,
            body: self.body_builder.finish(),
        }
    }
}
