use std::cell::RefCell;
use std::rc::Rc;

use tarebot::adapter::protocol::ErrorCode;
use tarebot::adapter::{AgentConnector, Bot, GatewayError, RemoteAgent};
use tarebot::types::{InputVector, OutputVector, Team, BOT_NAME, DIAGNOSTIC_INDEX};

type CallLog = Rc<RefCell<Vec<(InputVector, Team)>>>;

/// Echoes the observation and records every call it receives.
struct RecordingEcho {
    calls: CallLog,
}

impl RemoteAgent for RecordingEcho {
    fn get_output_vector(
        &mut self,
        input: &InputVector,
        team: Team,
    ) -> Result<OutputVector, GatewayError> {
        self.calls.borrow_mut().push((input.clone(), team));
        Ok(OutputVector::new(input.as_slice().to_vec()))
    }
}

struct RecordingConnector {
    calls: CallLog,
    connects: RefCell<usize>,
}

impl RecordingConnector {
    fn new() -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
            connects: RefCell::new(0),
        }
    }
}

impl AgentConnector for RecordingConnector {
    fn connect(&self) -> Result<Box<dyn RemoteAgent>, GatewayError> {
        *self.connects.borrow_mut() += 1;
        Ok(Box::new(RecordingEcho {
            calls: Rc::clone(&self.calls),
        }))
    }
}

struct Unreachable;

impl AgentConnector for Unreachable {
    fn connect(&self) -> Result<Box<dyn RemoteAgent>, GatewayError> {
        Err(GatewayError::connection("connection refused"))
    }
}

/// Fails every call the way a crashed strategy does.
struct Crashing;

impl RemoteAgent for Crashing {
    fn get_output_vector(
        &mut self,
        _input: &InputVector,
        _team: Team,
    ) -> Result<OutputVector, GatewayError> {
        Err(GatewayError::RemoteCall {
            code: ErrorCode::AgentFailure,
            message: "NullPointerException".to_string(),
        })
    }
}

fn observation(value: f64) -> InputVector {
    let mut values: Vec<f64> = (0..33).map(|i| i as f64 * 0.5).collect();
    values[DIAGNOSTIC_INDEX] = value;
    InputVector::new(values)
}

#[test]
fn decide_before_initialize_fails() {
    let mut bot = Bot::new();
    let err = bot.decide(&observation(3.1415)).expect_err("must not decide uninitialized");
    assert_eq!(err, GatewayError::NotInitialized);

    // Still deterministic on repeat.
    assert_eq!(bot.decide(&observation(1.0)), Err(GatewayError::NotInitialized));
}

#[test]
fn decide_forwards_input_and_team_unchanged() {
    let connector = RecordingConnector::new();
    let mut bot = Bot::connect(Team::Blue, &connector).expect("connect");

    let input = observation(3.1415);
    let output = bot.decide(&input).expect("decide");

    assert_eq!(output.as_slice(), input.as_slice());
    let calls = connector.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, input);
    assert_eq!(calls[0].1, Team::Blue);
}

#[test]
fn team_is_fixed_across_calls() {
    let connector = RecordingConnector::new();
    let mut bot = Bot::connect(Team::Orange, &connector).expect("connect");

    for i in 0..5 {
        bot.decide(&observation(i as f64)).expect("decide");
    }

    assert_eq!(bot.team(), Some(Team::Orange));
    assert!(connector.calls.borrow().iter().all(|(_, t)| *t == Team::Orange));
    assert_eq!(*connector.connects.borrow(), 1);
}

#[test]
fn name_is_constant() {
    let mut bot = Bot::new();
    assert_eq!(bot.name(), BOT_NAME);

    let connector = RecordingConnector::new();
    bot.initialize(Team::Orange, &connector).expect("initialize");
    assert_eq!(bot.name(), "TareBot");

    bot.decide(&observation(0.0)).expect("decide");
    assert_eq!(bot.name(), "TareBot");

    let blue = Bot::connect(Team::Blue, &connector).expect("connect");
    assert_eq!(blue.name(), bot.name());
}

#[test]
fn failed_connect_leaves_no_usable_bot() {
    let err = Bot::connect(Team::Blue, &Unreachable).err().expect("connect must fail");
    assert!(err.is_connection());

    let mut bot = Bot::new();
    assert!(bot.initialize(Team::Blue, &Unreachable).is_err());
    assert!(!bot.is_ready());
    assert_eq!(bot.decide(&observation(1.0)), Err(GatewayError::NotInitialized));
}

#[test]
fn second_initialize_keeps_team_and_agent() {
    let connector = RecordingConnector::new();
    let mut bot = Bot::connect(Team::Blue, &connector).expect("connect");

    let err = bot
        .initialize(Team::Orange, &connector)
        .expect_err("team is fixed once ready");
    assert_eq!(err, GatewayError::AlreadyInitialized);
    assert_eq!(bot.team(), Some(Team::Blue));
    assert_eq!(*connector.connects.borrow(), 1);

    bot.decide(&observation(1.0)).expect("decide");
    assert_eq!(connector.calls.borrow()[0].1, Team::Blue);
}

#[test]
fn connector_errors_surface_as_connection_errors() {
    let connector = || -> Result<Box<dyn RemoteAgent>, GatewayError> {
        Err(GatewayError::Protocol("expected agent, got output".to_string()))
    };
    let err = Bot::connect(Team::Blue, &connector).err().expect("connect must fail");
    assert!(err.is_connection(), "got {err:?}");
}

#[test]
fn remote_errors_propagate_unchanged() {
    let connector = || -> Result<Box<dyn RemoteAgent>, GatewayError> { Ok(Box::new(Crashing)) };
    let mut bot = Bot::connect(Team::Orange, &connector).expect("connect");

    let err = bot.decide(&observation(2.0)).expect_err("remote failure");
    assert_eq!(err.code(), Some(ErrorCode::AgentFailure));
    assert!(err.to_string().contains("NullPointerException"));

    // No local recovery: the next call reaches the agent again.
    assert!(bot.decide(&observation(2.0)).is_err());
}

#[test]
fn identical_inputs_yield_identical_outputs() {
    let connector = RecordingConnector::new();
    let mut bot = Bot::connect(Team::Blue, &connector).expect("connect");

    let input = observation(-7.25);
    let first = bot.decide(&input).expect("first");
    let second = bot.decide(&input).expect("second");
    assert_eq!(first, second);
}

#[test]
fn short_observations_are_forwarded() {
    let connector = RecordingConnector::new();
    let mut bot = Bot::connect(Team::Blue, &connector).expect("connect");

    let input = InputVector::new(vec![1.0, 2.0, 3.0]);
    let output = bot.decide(&input).expect("decide");
    assert_eq!(output.as_slice(), &[1.0, 2.0, 3.0]);
}
