use super::components::{connect_command, ComponentKind, CreateCommand, Role};
use crate::channel::CommandSink;
use crate::error::{ControlError, ControlResult};
use log::{debug, info};
use std::collections::HashSet;

/// Builds a linear source → processors → sink chain from creation calls that
/// carry no explicit wiring.
///
/// The cursor names the last component whose output port is still unwired.
/// Each processor or sink is connected to it; a source may only start a chain
/// when nothing is pending.
#[derive(Debug, Default)]
pub struct ComponentGraphBuilder {
    names: HashSet<String>,
    cursor: Option<String>,
}

impl ComponentGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names declared since the last reset, sorted.
    pub fn component_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names.iter().cloned().collect();
        names.sort();
        names
    }

    /// Forget every component and any pending output.
    pub fn reset(&mut self) {
        debug!("[GRAPH] Clearing {} component(s)", self.names.len());
        self.names.clear();
        self.cursor = None;
    }

    pub fn check_absent(&self, name: &str) -> ControlResult<()> {
        if self.names.contains(name) {
            return Err(ControlError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    pub fn check_present(&self, name: &str) -> ControlResult<()> {
        if !self.names.contains(name) {
            return Err(ControlError::ComponentNotFound(name.to_string()));
        }
        Ok(())
    }

    /// Verify the cursor state allows a component with `role` to be wired in.
    fn check_wiring(&self, name: &str, role: Role) -> ControlResult<()> {
        match (role, &self.cursor) {
            (Role::Source, Some(pending)) => {
                Err(ControlError::UnexpectedInputOnSource(pending.clone()))
            }
            (Role::Processor | Role::Sink, None) => {
                Err(ControlError::DanglingInputRequired(name.to_string()))
            }
            _ => Ok(()),
        }
    }

    pub fn connect_source(&mut self, name: &str) -> ControlResult<()> {
        self.check_wiring(name, Role::Source)?;
        self.cursor = Some(name.to_string());
        Ok(())
    }

    pub fn connect_processor<S: CommandSink>(&mut self, name: &str, sink: &mut S) -> ControlResult<()> {
        self.connect_from_cursor(name, Role::Processor, sink)?;
        self.cursor = Some(name.to_string());
        Ok(())
    }

    pub fn connect_sink<S: CommandSink>(&mut self, name: &str, sink: &mut S) -> ControlResult<()> {
        self.connect_from_cursor(name, Role::Sink, sink)?;
        self.cursor = None;
        Ok(())
    }

    fn connect_from_cursor<S: CommandSink>(
        &self,
        name: &str,
        role: Role,
        sink: &mut S,
    ) -> ControlResult<()> {
        self.check_wiring(name, role)?;
        let producer = self
            .cursor
            .as_deref()
            .ok_or_else(|| ControlError::DanglingInputRequired(name.to_string()))?;
        sink.send(&connect_command(producer, name))
    }

    /// Point the cursor back at an existing component to branch a new chain
    /// from its output.
    pub fn reconnect(&mut self, name: &str) -> ControlResult<()> {
        self.check_present(name)?;
        debug!("[GRAPH] Cursor moved to '{}'", name);
        self.cursor = Some(name.to_string());
        Ok(())
    }

    /// Wire two existing components directly, leaving the cursor untouched.
    pub fn connect<S: CommandSink>(
        &mut self,
        producer: &str,
        consumer: &str,
        sink: &mut S,
    ) -> ControlResult<()> {
        self.check_present(producer)?;
        self.check_present(consumer)?;
        sink.send(&connect_command(producer, consumer))
    }

    /// Declare a component and wire it into the current chain.
    ///
    /// Name and wiring checks all run before anything is sent, so a rejected
    /// creation leaves the command channel untouched.
    pub fn create<S: CommandSink>(
        &mut self,
        name: &str,
        kind: &ComponentKind,
        sink: &mut S,
    ) -> ControlResult<()> {
        validate_name(name)?;
        self.check_absent(name)?;
        let role = kind.role();
        self.check_wiring(name, role)?;

        sink.send(&CreateCommand { name, kind }.to_string())?;
        self.names.insert(name.to_string());
        info!("[GRAPH] Created {} '{}'", kind.type_name(), name);

        match role {
            Role::Source => self.connect_source(name),
            Role::Processor => self.connect_processor(name, sink),
            Role::Sink => self.connect_sink(name, sink),
        }
    }
}

fn validate_name(name: &str) -> ControlResult<()> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(ControlError::InvalidParameter(format!(
            "component name '{}'",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> ComponentKind {
        ComponentKind::radio_source(433.0, 499_200).unwrap()
    }

    #[test]
    fn source_then_sink_connects_once() {
        let mut graph = ComponentGraphBuilder::new();
        let mut sent = Vec::new();

        graph.create("src", &source(), &mut sent).unwrap();
        graph
            .create("disp", &ComponentKind::DisplaySink, &mut sent)
            .unwrap();

        assert_eq!(
            sent,
            vec![
                "CREATE RADIO-SOURCE src 433000000 499200",
                "CREATE DISPLAY-SINK disp",
                "CONNECT src out disp in",
            ]
        );
        assert_eq!(graph.cursor(), None);
    }

    #[test]
    fn processors_advance_the_cursor() {
        let mut graph = ComponentGraphBuilder::new();
        let mut sent = Vec::new();

        graph.create("src", &source(), &mut sent).unwrap();
        graph
            .create("framer", &ComponentKind::SimpleFramer, &mut sent)
            .unwrap();
        assert_eq!(graph.cursor(), Some("framer"));
        graph
            .create("enc", &ComponentKind::ManchesterEncoder, &mut sent)
            .unwrap();

        let connects: Vec<&String> = sent.iter().filter(|c| c.starts_with("CONNECT")).collect();
        assert_eq!(
            connects,
            vec!["CONNECT src out framer in", "CONNECT framer out enc in"]
        );
        assert_eq!(graph.cursor(), Some("enc"));
    }

    #[test]
    fn duplicate_name_emits_nothing() {
        let mut graph = ComponentGraphBuilder::new();
        let mut sent = Vec::new();
        graph.create("src", &source(), &mut sent).unwrap();
        graph
            .create("disp", &ComponentKind::DisplaySink, &mut sent)
            .unwrap();
        sent.clear();

        let err = graph.create("src", &source(), &mut sent).unwrap_err();
        assert!(matches!(err, ControlError::DuplicateName(ref n) if n == "src"));
        assert!(sent.is_empty());
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn sink_without_input_is_rejected() {
        let mut graph = ComponentGraphBuilder::new();
        let mut sent = Vec::new();

        let err = graph
            .create("disp2", &ComponentKind::DisplaySink, &mut sent)
            .unwrap_err();
        assert!(err.to_string().contains("must have an input"));
        assert!(sent.is_empty());
        assert!(!graph.contains("disp2"));
    }

    #[test]
    fn source_with_pending_output_is_rejected() {
        let mut graph = ComponentGraphBuilder::new();
        let mut sent = Vec::new();
        graph.create("src", &source(), &mut sent).unwrap();
        sent.clear();

        let err = graph.create("src2", &source(), &mut sent).unwrap_err();
        assert!(err
            .to_string()
            .contains("Source component should not have an input"));
        assert!(sent.is_empty());
        assert_eq!(graph.cursor(), Some("src"));
    }

    #[test]
    fn reconnect_branches_from_existing_source() {
        let mut graph = ComponentGraphBuilder::new();
        let mut sent = Vec::new();
        graph.create("src", &source(), &mut sent).unwrap();
        graph
            .create("spectrum", &ComponentKind::DisplaySink, &mut sent)
            .unwrap();

        assert!(matches!(
            graph.reconnect("nope"),
            Err(ControlError::ComponentNotFound(_))
        ));

        graph.reconnect("src").unwrap();
        graph
            .create("deframer", &ComponentKind::SimpleDeframer, &mut sent)
            .unwrap();
        assert_eq!(sent.last().unwrap(), "CONNECT src out deframer in");
    }

    #[test]
    fn explicit_connect_requires_both_ends() {
        let mut graph = ComponentGraphBuilder::new();
        let mut sent = Vec::new();
        graph.create("src", &source(), &mut sent).unwrap();
        sent.clear();

        assert!(graph.connect("src", "missing", &mut sent).is_err());
        assert!(sent.is_empty());

        graph
            .create("lpf", &ComponentKind::low_pass_filter(100.0, 400_000).unwrap(), &mut sent)
            .unwrap();
        sent.clear();
        graph.connect("src", "lpf", &mut sent).unwrap();
        assert_eq!(sent, vec!["CONNECT src out lpf in"]);
        assert_eq!(graph.cursor(), Some("lpf"));
    }

    #[test]
    fn connect_helpers_follow_cursor_rules() {
        let mut graph = ComponentGraphBuilder::new();
        let mut sent = Vec::new();

        assert!(graph.connect_processor("p", &mut sent).is_err());
        graph.connect_source("a").unwrap();
        assert!(graph.connect_source("b").is_err());
        graph.connect_processor("p", &mut sent).unwrap();
        graph.connect_sink("s", &mut sent).unwrap();
        assert_eq!(graph.cursor(), None);
        assert_eq!(sent, vec!["CONNECT a out p in", "CONNECT p out s in"]);
    }

    #[test]
    fn reset_clears_names_and_cursor() {
        let mut graph = ComponentGraphBuilder::new();
        let mut sent = Vec::new();
        graph.create("src", &source(), &mut sent).unwrap();

        graph.reset();
        assert!(graph.is_empty());
        assert_eq!(graph.cursor(), None);
        graph.create("src", &source(), &mut sent).unwrap();
    }

    #[test]
    fn names_with_whitespace_are_refused() {
        let mut graph = ComponentGraphBuilder::new();
        let mut sent = Vec::new();
        assert!(matches!(
            graph.create("my src", &source(), &mut sent),
            Err(ControlError::InvalidParameter(_))
        ));
        assert!(sent.is_empty());
    }
}
