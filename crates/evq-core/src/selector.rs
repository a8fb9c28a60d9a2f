//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Dashboard synchronisation and rendering core."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use evq_client::AgentState;

use crate::surface::{SelectorSurface, SurfaceError};

/// Label of the empty selector entry.
pub const NO_SELECTION_LABEL: &str = "Select an EV";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentStatus {
    Completed,
    Abandoned,
    Charging,
    InQueue,
    Driving,
}

impl AgentStatus {
    /// Priority: completed, abandoned, charging, queued.
    pub fn of(agent: &AgentState) -> Self {
        if agent.trip_completed {
            AgentStatus::Completed
        } else if agent.abandoned {
            AgentStatus::Abandoned
        } else if agent.charging {
            AgentStatus::Charging
        } else if agent.in_queue {
            AgentStatus::InQueue
        } else {
            AgentStatus::Driving
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgentStatus::Completed => "Completed",
            AgentStatus::Abandoned => "Abandoned",
            AgentStatus::Charging => "Charging",
            AgentStatus::InQueue => "In Queue",
            AgentStatus::Driving => "Driving",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorOption {
    pub agent_id: String,
    pub label: String,
}

impl From<&AgentState> for SelectorOption {
    fn from(agent: &AgentState) -> Self {
        Self {
            agent_id: agent.id.clone(),
            label: format!(
                "{} - {} - Battery: {:.1}%",
                agent.id,
                AgentStatus::of(agent).label(),
                agent.state_of_charge * 100.0
            ),
        }
    }
}

/// What happened to the previous selection after a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionRestore {
    Nothing,
    Retained(String),
    Dropped(String),
}

pub struct AgentSelector {
    surface: Box<dyn SelectorSurface>,
    options: Vec<SelectorOption>,
}

impl AgentSelector {
    pub fn new(surface: Box<dyn SelectorSurface>) -> Self {
        Self {
            surface,
            options: Vec::new(),
        }
    }

    /// Rebuild all options and restore `previous` if it is still listed.
    pub fn refresh(
        &mut self,
        agents: &[AgentState],
        previous: Option<&str>,
    ) -> Result<SelectionRestore, SurfaceError> {
        self.options = agents.iter().map(SelectorOption::from).collect();
        self.surface.set_options(&self.options)?;
        let Some(previous) = previous else {
            self.surface.set_selected(None)?;
            return Ok(SelectionRestore::Nothing);
        };
        if self.contains(previous) {
            self.surface.set_selected(Some(previous))?;
            Ok(SelectionRestore::Retained(previous.to_owned()))
        } else {
            self.surface.set_selected(None)?;
            Ok(SelectionRestore::Dropped(previous.to_owned()))
        }
    }

    pub fn select(&mut self, agent_id: Option<&str>) -> Result<(), SurfaceError> {
        self.surface.set_selected(agent_id)
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.options.iter().any(|option| option.agent_id == agent_id)
    }

    pub fn options(&self) -> &[SelectorOption] {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evq_client::LatLng;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeSelect(Arc<Mutex<(Vec<SelectorOption>, Option<String>)>>);

    impl SelectorSurface for FakeSelect {
        fn set_options(&mut self, options: &[SelectorOption]) -> Result<(), SurfaceError> {
            self.0.lock().unwrap().0 = options.to_vec();
            Ok(())
        }

        fn set_selected(&mut self, agent_id: Option<&str>) -> Result<(), SurfaceError> {
            self.0.lock().unwrap().1 = agent_id.map(str::to_owned);
            Ok(())
        }
    }

    fn agent(id: &str) -> AgentState {
        AgentState::new(id, LatLng::new(0.0, 0.0), 0.5)
    }

    #[test]
    fn status_priority_prefers_completion() {
        let mut subject = agent("A1");
        subject.charging = true;
        subject.in_queue = true;
        assert_eq!(AgentStatus::of(&subject), AgentStatus::Charging);
        subject.abandoned = true;
        assert_eq!(AgentStatus::of(&subject), AgentStatus::Abandoned);
        subject.trip_completed = true;
        assert_eq!(AgentStatus::of(&subject), AgentStatus::Completed);
    }

    #[test]
    fn option_label_format() {
        let mut subject = agent("ev-7");
        subject.in_queue = true;
        subject.state_of_charge = 0.4567;
        assert_eq!(
            SelectorOption::from(&subject).label,
            "ev-7 - In Queue - Battery: 45.7%"
        );
    }

    #[test]
    fn keeps_selection_when_present() {
        let surface = FakeSelect::default();
        let mut selector = AgentSelector::new(Box::new(surface.clone()));
        let restore = selector
            .refresh(&[agent("A1"), agent("A2")], Some("A1"))
            .unwrap();
        assert_eq!(restore, SelectionRestore::Retained("A1".into()));
        assert_eq!(surface.0.lock().unwrap().1.as_deref(), Some("A1"));
    }

    #[test]
    fn clears_selection_when_absent() {
        let surface = FakeSelect::default();
        let mut selector = AgentSelector::new(Box::new(surface.clone()));
        let restore = selector.refresh(&[agent("A2")], Some("A1")).unwrap();
        assert_eq!(restore, SelectionRestore::Dropped("A1".into()));
        assert_eq!(surface.0.lock().unwrap().1, None);
        assert_eq!(selector.options().len(), 1);
    }
}
