use math::{GeoPosition, Heading, Length, STANDARD_PRESSURE, Speed, TurnDirection};
use smallvec::smallvec;

use super::{
    AltitudeSpec, Context, Instruction, InstructionError, Kind, Queued, RejectReason,
    WorldInstructExt, ingest,
};
use crate::sim::agent::{
    self, AgentSpec, Flags, FlightParams, Goal, Instructions, Maneuver, TransponderMode,
};
use crate::sim::aircraft_type::{AircraftTypes, Category, Performance};
use crate::sim::airfield::{Airfield, Navpoint, NavpointKind};
use crate::sim::comm::Class;
use crate::sim::ground::{AcceptedCategories, GroundNetwork, ParkingKind, ParkingPosition};
use crate::sim::status::Status;
use crate::sim::tests::{
    Heard, ORIGIN, airborne_params, at, base_app, ground_params, params_of, spawn_agent,
    test_airfield, test_ground,
};

struct Fixture {
    params:      FlightParams,
    goal:        Goal,
    performance: Performance,
    airfield:    Airfield,
    ground:      GroundNetwork,
}

impl Fixture {
    fn new(params: FlightParams, goal: Goal) -> Self {
        let (mut ground, _) = test_ground();
        ground
            .add_parking(ParkingPosition {
                id:         "H1".into(),
                position:   at(0.6, -0.45),
                heading:    Heading::SOUTH,
                kind:       ParkingKind::Gate,
                categories: AcceptedCategories::Only(smallvec![Category::Heavy]),
            })
            .unwrap();

        Self {
            params,
            goal,
            performance: AircraftTypes::default().get("A320").unwrap().clone(),
            airfield: test_airfield(),
            ground,
        }
    }

    fn airborne() -> Self {
        Self::new(airborne_params(at(-10., 0.), Heading::EAST, 5000., 250.), Goal::Landing { ils: true })
    }

    fn on_ground(status: Status, goal: Goal) -> Self {
        Self::new(ground_params(at(0., -0.05), Heading::NORTH, status), goal)
    }

    fn ctx(&self) -> Context<'_> {
        Context {
            params:      &self.params,
            goal:        &self.goal,
            performance: &self.performance,
            airfield:    Some(&self.airfield),
            ground:      Some(&self.ground),
            qnh:         STANDARD_PRESSURE,
        }
    }

    fn ingest_all(
        &self,
        queue: &mut Vec<Queued>,
        batch: impl IntoIterator<Item = Instruction>,
    ) -> Result<(), RejectReason> {
        batch.into_iter().try_for_each(|instr| ingest(queue, &self.ctx(), instr.into()))
    }
}

fn kinds(queue: &[Queued]) -> Vec<Kind> { queue.iter().map(|q| q.instruction.kind()).collect() }

fn navpoint(code: &str, position: GeoPosition) -> Navpoint {
    Navpoint { code: code.into(), kind: NavpointKind::Fix, position }
}

fn heading(degrees: f32) -> Instruction {
    Instruction::HeadingVector { heading: Heading::from_degrees(degrees), turn: None }
}

#[test]
fn vectors_rejected_on_ground() {
    let fixture = Fixture::on_ground(Status::Taxiing, Goal::None);
    let mut queue = Vec::new();

    let err = fixture.ingest_all(&mut queue, [heading(90.)]).unwrap_err();
    assert_eq!(err, RejectReason::NotAirborne);
    assert_eq!(err.to_string(), "not a time for vectors");

    assert_eq!(
        fixture.ingest_all(&mut queue, [Instruction::SpeedVector(Speed::from_knots(200.))]),
        Err(RejectReason::SpeedOnGround),
    );
    assert!(queue.is_empty());
}

#[test]
fn vectors_rejected_once_approach_cleared() {
    let fixture = Fixture::airborne();
    let mut queue = Vec::new();
    fixture
        .ingest_all(&mut queue, [Instruction::ExpectRunway("09".into()), Instruction::ClearedApproach])
        .unwrap();

    for instr in [
        heading(90.),
        Instruction::AltitudeVector(AltitudeSpec::Feet(3000.)),
        Instruction::DirectTo(navpoint("ALPHA", at(5., 5.))),
        Instruction::FollowRoute(vec![navpoint("ALPHA", at(5., 5.))]),
        Instruction::Hold { fix: navpoint("ALPHA", at(5., 5.)), turn: TurnDirection::Clockwise },
    ] {
        assert_eq!(fixture.ingest_all(&mut queue, [instr]), Err(RejectReason::ApproachCleared));
    }

    let landing = Fixture::new(
        FlightParams { status: Status::Landing("09".into()), ..fixture.params.clone() },
        fixture.goal.clone(),
    );
    assert_eq!(landing.ingest_all(&mut Vec::new(), [heading(90.)]), Err(RejectReason::ApproachCleared));
}

#[test]
fn altitude_vector_limited_by_ceiling() {
    let fixture = Fixture::airborne();
    let mut queue = Vec::new();

    let err = fixture
        .ingest_all(&mut queue, [Instruction::AltitudeVector(AltitudeSpec::FlightLevel(400))])
        .unwrap_err();
    assert_eq!(err, RejectReason::AboveCeiling(AltitudeSpec::FlightLevel(400)));
    assert_eq!(err.to_string(), "FL400 is above our ceiling");
    assert!(queue.is_empty());

    fixture.ingest_all(&mut queue, [Instruction::AltitudeVector(AltitudeSpec::FlightLevel(390))]).unwrap();
    assert_eq!(kinds(&queue), [Kind::AltitudeVector]);
}

#[test]
fn speed_vector_limited_by_type() {
    let fixture = Fixture::airborne();
    let mut queue = Vec::new();

    assert_eq!(
        fixture.ingest_all(&mut queue, [Instruction::SpeedVector(Speed::from_knots(100.))]),
        Err(RejectReason::SpeedTooLow),
    );
    assert_eq!(
        fixture.ingest_all(&mut queue, [Instruction::SpeedVector(Speed::from_knots(400.))]),
        Err(RejectReason::SpeedTooHigh),
    );
    fixture.ingest_all(&mut queue, [Instruction::SpeedVector(Speed::from_knots(210.))]).unwrap();
    fixture.ingest_all(&mut queue, [Instruction::CancelSpeedVector]).unwrap();
    assert_eq!(kinds(&queue), [Kind::CancelSpeedVector]);
}

#[test]
fn heading_family_supersedes_each_other() {
    let fixture = Fixture::airborne();
    let mut queue = Vec::new();
    fixture
        .ingest_all(
            &mut queue,
            [heading(90.), Instruction::AltitudeVector(AltitudeSpec::FlightLevel(120))],
        )
        .unwrap();

    fixture.ingest_all(&mut queue, [Instruction::DirectTo(navpoint("ALPHA", at(5., 5.)))]).unwrap();
    assert_eq!(kinds(&queue), [Kind::AltitudeVector, Kind::DirectTo]);

    fixture.ingest_all(&mut queue, [heading(180.)]).unwrap();
    assert_eq!(kinds(&queue), [Kind::AltitudeVector, Kind::HeadingVector]);
}

#[test]
fn intercept_keeps_heading_vector() {
    let fixture = Fixture::airborne();
    let mut queue = Vec::new();
    fixture
        .ingest_all(
            &mut queue,
            [
                Instruction::Hold { fix: navpoint("ALPHA", at(5., 5.)), turn: TurnDirection::Clockwise },
                heading(90.),
                Instruction::InterceptLocalizer("09".into()),
            ],
        )
        .unwrap();
    assert_eq!(kinds(&queue), [Kind::HeadingVector, Kind::InterceptLocalizer]);

    fixture
        .ingest_all(
            &mut queue,
            [Instruction::InterceptNavaid {
                navaid: navpoint("VOR", at(0., 10.)),
                radial: Heading::SOUTH,
            }],
        )
        .unwrap();
    assert_eq!(kinds(&queue), [Kind::HeadingVector, Kind::InterceptNavaid]);
}

#[test]
fn intercept_localizer_requires_ils() {
    let fixture = Fixture::airborne();
    let mut queue = Vec::new();
    assert_eq!(
        fixture.ingest_all(&mut queue, [Instruction::InterceptLocalizer("27".into())]),
        Err(RejectReason::NoIls("27".into())),
    );
    assert_eq!(
        fixture.ingest_all(&mut queue, [Instruction::InterceptLocalizer("36".into())]),
        Err(RejectReason::UnknownRunway("36".into())),
    );
}

#[test]
fn cleared_approach_requires_landing_goal_and_runway() {
    let fixture = Fixture::airborne();
    assert_eq!(
        fixture.ingest_all(&mut Vec::new(), [Instruction::ClearedApproach]),
        Err(RejectReason::NoExpectedRunway),
    );

    let departure = Fixture::new(fixture.params.clone(), Goal::Destination("VHHH".into()));
    let err = departure
        .ingest_all(&mut Vec::new(), [Instruction::ExpectRunway("09".into()), Instruction::ClearedApproach])
        .unwrap_err();
    assert_eq!(err.to_string(), "not inbound for landing");

    let mut queue = Vec::new();
    fixture
        .ingest_all(
            &mut queue,
            [
                Instruction::Hold { fix: navpoint("ALPHA", at(5., 5.)), turn: TurnDirection::Clockwise },
                Instruction::InterceptLocalizer("09".into()),
                Instruction::ClearedApproach,
            ],
        )
        .unwrap();
    assert_eq!(kinds(&queue), [Kind::InterceptLocalizer, Kind::ClearedApproach]);
}

#[test]
fn landing_clearance_requires_approach_clearance() {
    let fixture = Fixture::airborne();
    let mut queue = Vec::new();
    assert_eq!(
        fixture.ingest_all(&mut queue, [Instruction::ClearedToLand]),
        Err(RejectReason::ApproachNotCleared),
    );
    assert_eq!(
        fixture.ingest_all(&mut queue, [Instruction::CancelApproach]),
        Err(RejectReason::ApproachNotCleared),
    );

    fixture
        .ingest_all(
            &mut queue,
            [
                Instruction::InterceptLocalizer("09".into()),
                Instruction::ClearedApproach,
                Instruction::ClearedToLand,
            ],
        )
        .unwrap();
    fixture.ingest_all(&mut queue, [Instruction::CancelApproach]).unwrap();
    assert_eq!(kinds(&queue), [Kind::CancelApproach]);
}

#[test]
fn squawk_code_must_be_four_octal_digits() {
    let fixture = Fixture::airborne();
    let mut queue = Vec::new();
    for code in ["7800", "123", "12345", "12a4"] {
        assert_eq!(
            fixture.ingest_all(&mut queue, [Instruction::Squawk { code: code.into(), mode: None }]),
            Err(RejectReason::InvalidSquawk(code.into())),
        );
    }
    fixture
        .ingest_all(&mut queue, [Instruction::Squawk { code: "7700".into(), mode: None }])
        .unwrap();
}

#[test]
fn ground_clearances_follow_phase() {
    let taxiing = Fixture::on_ground(Status::Taxiing, Goal::Destination("VHHH".into()));
    assert_eq!(taxiing.ingest_all(&mut Vec::new(), [Instruction::LineUp]), Err(RejectReason::NotReady));
    assert_eq!(
        taxiing.ingest_all(&mut Vec::new(), [Instruction::ClearedTakeoff]),
        Err(RejectReason::NotReady),
    );

    let ready = Fixture::on_ground(Status::Ready("09".into()), Goal::Destination("VHHH".into()));
    let mut queue = Vec::new();
    ready.ingest_all(&mut queue, [Instruction::HoldPosition, Instruction::LineUp]).unwrap();
    assert_eq!(kinds(&queue), [Kind::LineUp]);
    ready.ingest_all(&mut queue, [Instruction::ClearedTakeoff]).unwrap();
    assert_eq!(kinds(&queue), [Kind::ClearedTakeoff]);

    let lined_up = Fixture::on_ground(Status::LinedUp("09".into()), Goal::Destination("VHHH".into()));
    let mut queue = Vec::new();
    lined_up.ingest_all(&mut queue, [Instruction::ClearedTakeoff, Instruction::HoldPosition]).unwrap();
    assert_eq!(kinds(&queue), [Kind::HoldPosition]);

    let rolling = Fixture::on_ground(Status::TakeoffRoll("09".into()), Goal::Destination("VHHH".into()));
    assert_eq!(
        rolling.ingest_all(&mut Vec::new(), [Instruction::HoldPosition]),
        Err(RejectReason::TakingOff),
    );
    assert_eq!(
        Fixture::airborne().ingest_all(&mut Vec::new(), [Instruction::HoldPosition]),
        Err(RejectReason::NotOnGround),
    );
}

#[test]
fn expect_runway_on_ground() {
    let arrival = Fixture::on_ground(Status::Taxiing, Goal::Parking("G1".into()));
    assert_eq!(
        arrival.ingest_all(&mut Vec::new(), [Instruction::ExpectRunway("09".into())]),
        Err(RejectReason::Arriving),
    );

    let lined_up = Fixture::on_ground(Status::LinedUp("09".into()), Goal::Destination("VHHH".into()));
    assert_eq!(
        lined_up.ingest_all(&mut Vec::new(), [Instruction::ExpectRunway("27".into())]),
        Err(RejectReason::OnRunway),
    );

    let departure = Fixture::on_ground(Status::Taxiing, Goal::Destination("VHHH".into()));
    assert_eq!(
        departure.ingest_all(&mut Vec::new(), [Instruction::ExpectRunway("18".into())]),
        Err(RejectReason::UnknownRunway("18".into())),
    );
    departure.ingest_all(&mut Vec::new(), [Instruction::ExpectRunway("09".into())]).unwrap();
}

#[test]
fn taxi_validates_route_and_parking() {
    let (_, nodes) = test_ground();
    let fixture = Fixture::on_ground(Status::Taxiing, Goal::Parking("G1".into()));
    let taxi = |parking: &str| Instruction::Taxi {
        route:   nodes.apron.to_vec(),
        parking: Some(parking.into()),
    };

    let mut queue = Vec::new();
    fixture.ingest_all(&mut queue, [Instruction::HoldPosition, taxi("G1")]).unwrap();
    assert_eq!(kinds(&queue), [Kind::Taxi]);

    assert_eq!(
        fixture.ingest_all(&mut queue, [taxi("H1")]),
        Err(RejectReason::UnsuitedParking("H1".into())),
    );
    assert_eq!(
        fixture.ingest_all(&mut queue, [taxi("Z9")]),
        Err(RejectReason::UnknownParking("Z9".into())),
    );

    let airborne = Fixture::airborne();
    assert_eq!(airborne.ingest_all(&mut Vec::new(), [taxi("G1")]), Err(RejectReason::Airborne));

    let rolling = Fixture::new(
        FlightParams {
            ias: Speed::from_knots(30.),
            ..ground_params(ORIGIN, Heading::EAST, Status::LandingRoll(Some("09".into())))
        },
        Goal::Landing { ils: true },
    );
    assert_eq!(rolling.ingest_all(&mut Vec::new(), [taxi("G1")]), Err(RejectReason::Rolling));
}

#[test]
fn completion_predicates() {
    let arrival = Length::from_nm(1.);
    let params = airborne_params(at(0., 0.), Heading::EAST, 5000., 250.);

    assert!(Instruction::DirectTo(navpoint("NEAR", at(0.9, 0.))).is_done(&params, arrival));
    assert!(!Instruction::DirectTo(navpoint("FAR", at(1.1, 0.))).is_done(&params, arrival));
    assert!(Instruction::FollowRoute(Vec::new()).is_done(&params, arrival));
    assert!(!heading(90.).is_done(&params, arrival));
    assert!(Instruction::SayIntentions.is_done(&params, arrival));
    assert!(Instruction::ClearedTakeoff.is_done(&params, arrival));
    assert!(!Instruction::ClearedApproach.is_done(&params, arrival));
    assert!(!Instruction::ExpectRunway("09".into()).is_done(&params, arrival));

    let ready = ground_params(ORIGIN, Heading::EAST, Status::Ready("09".into()));
    assert!(Instruction::ExpectRunway("09".into()).is_done(&ready, arrival));
    assert!(!Instruction::LineUp.is_done(&ready, arrival));
    assert!(Instruction::ClearedApproach.is_done(&ready, arrival));
    assert!(
        Instruction::Taxi { route: Vec::new(), parking: None }.is_done(&ready, arrival)
    );
    assert!(
        !Instruction::Taxi { route: Vec::new(), parking: Some("G1".into()) }.is_done(&ready, arrival)
    );
}

#[test]
fn rejected_batch_leaves_queue_untouched() {
    let mut app = base_app();
    let agent = spawn_agent(
        &mut app,
        "CPA201",
        airborne_params(at(-10., 0.), Heading::EAST, 5000., 250.),
        Goal::Landing { ils: true },
    );
    app.world_mut()
        .instruct(agent, [Instruction::AltitudeVector(AltitudeSpec::Feet(4000.))])
        .unwrap();
    let before = app.world().get::<Instructions>(agent).unwrap().clone();

    let err = app
        .world_mut()
        .instruct(
            agent,
            [
                heading(120.),
                Instruction::Squawk { code: "4321".into(), mode: None },
                Instruction::SpeedVector(Speed::from_knots(90.)),
            ],
        )
        .unwrap_err();
    assert_eq!(err, InstructionError::Rejected { index: 2, reason: RejectReason::SpeedTooLow });

    assert_eq!(app.world().get::<Instructions>(agent).unwrap(), &before);
    assert_eq!(params_of(&app, agent).squawk.to_string(), "2000");

    app.update();
    assert!(app.world().resource::<Heard>().contains(Class::NeedAck, "unable, speed is too low"));
}

#[test]
fn accepted_batch_commits_immediate_effects() {
    let mut app = base_app();
    let agent = spawn_agent(
        &mut app,
        "CPA202",
        airborne_params(at(-10., 0.), Heading::EAST, 5000., 250.),
        Goal::Landing { ils: true },
    );

    app.world_mut()
        .instruct(
            agent,
            [
                Instruction::Squawk { code: "4321".into(), mode: Some(TransponderMode::ModeS) },
                Instruction::SayIntentions,
                heading(120.),
            ],
        )
        .unwrap();

    let params = params_of(&app, agent);
    assert_eq!(params.squawk.to_string(), "4321");
    assert_eq!(params.transponder, TransponderMode::ModeS);
    assert_eq!(kinds(&app.world().get::<Instructions>(agent).unwrap().0), [Kind::HeadingVector]);

    app.update();
    let heard = app.world().resource::<Heard>();
    assert!(heard.contains(Class::VerboseInfo, "squawk 4321 mode S, say intentions, fly heading 120"));
    assert!(heard.contains(Class::NeedAck, "inbound for ILS approach"));
}

#[test]
fn cancel_approach_leaves_final() {
    let mut app = base_app();
    let agent = agent::insert(
        app.world_mut(),
        AgentSpec {
            callsign:  "CPA203".into(),
            type_code: "A320".into(),
            params:    FlightParams {
                status: Status::Landing("09".into()),
                ..airborne_params(at(-5., 0.), Heading::EAST, 1500., 160.)
            },
            goal:      Goal::Landing { ils: true },
        },
        Flags::default(),
        Instructions(vec![
            Instruction::ExpectRunway("09".into()).into(),
            Instruction::ClearedApproach.into(),
        ]),
        Maneuver::default(),
    )
    .unwrap();

    app.world_mut().instruct(agent, [Instruction::CancelApproach]).unwrap();
    assert_eq!(params_of(&app, agent).status, Status::Airborne);
    assert!(!app.world().get::<Instructions>(agent).unwrap().has(Kind::ClearedApproach));
}

#[test]
fn instructing_a_removed_agent_fails() {
    let mut app = base_app();
    let agent = spawn_agent(
        &mut app,
        "CPA204",
        airborne_params(at(-10., 0.), Heading::EAST, 5000., 250.),
        Goal::None,
    );
    app.world_mut().despawn(agent);
    assert_eq!(
        app.world_mut().instruct(agent, [Instruction::HandOver]),
        Err(InstructionError::NoAgent(agent)),
    );
}
