//! Bundled output of one kernel transition: commands to issue plus
//! side effects to carry out. Mirrors the `Output` shape used by the
//! replica core this crate is modeled on: the kernel returns data, the
//! runtime acts on it.

use crate::command::IssueCommand;
use crate::effect::Effect;

#[derive(Debug, Clone, Default)]
pub struct KernelOutput {
    pub commands: Vec<IssueCommand>,
    pub effects: Vec<Effect>,
}

impl KernelOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(mut self, cmd: IssueCommand) -> Self {
        self.commands.push(cmd);
        self
    }

    pub fn effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.effects.is_empty()
    }

    pub fn merge(&mut self, mut other: KernelOutput) {
        self.commands.append(&mut other.commands);
        self.effects.append(&mut other.effects);
    }
}
