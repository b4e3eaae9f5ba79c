use naval_physics::{
    Body, BodyHandle, BodyParams, Damageable, FlatTerrain, RadiusField, ShipDrag, Simulation, SimulationConfig,
    Vec2, collision, damage_out_of_max,
};
use std::collections::HashMap;
use std::sync::Arc;

const DT: f32 = 1.0 / 60.0;
const SHIP_LCS: f32 = 2.0;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Default)]
struct Hull {
    points: f32,
}

impl Damageable for Hull {
    fn take_damage(&mut self, amount: f32, _dt: Option<f32>) {
        self.points += amount;
    }

    fn damage(&self) -> f32 {
        self.points
    }

    fn max_damage(&self) -> Option<f32> {
        Some(300.0)
    }
}

fn ship_params(velocity: Vec2, angle: f32) -> BodyParams {
    BodyParams {
        size: 14.0,
        weight: 400.0,
        angle,
        velocity,
        drag: Some(Arc::new(ShipDrag::new(SHIP_LCS))),
        ..BodyParams::default()
    }
}

fn ship_lcs(body: &Body) -> Option<f32> {
    (body.size >= 10.0).then_some(SHIP_LCS)
}

#[test]
fn dropped_body_settles_without_blowing_up() {
    init();
    let mut sim = Simulation::new();
    let terrain = FlatTerrain::default();
    let handle = sim
        .create_body(
            Vec2::zero(),
            BodyParams {
                altitude: Some(1.0),
                ..BodyParams::default()
            },
        )
        .unwrap();

    let mut entered_water = false;
    for _ in 0..900 {
        sim.tick(DT).unwrap();
        let body = sim.get(handle).unwrap();
        let submersion = body.submersion(&terrain, sim.water_level());

        assert!((0.0..=1.0).contains(&submersion));
        assert!(body.vertical_speed.abs() < 20.0);
        entered_water |= submersion > 0.0;
    }

    // Too dense to float: it comes to rest on the seabed, fully submerged.
    let body = sim.get(handle).unwrap();
    assert!(entered_water);
    assert!((body.altitude - (terrain.height + 0.5)).abs() < 0.01);
    assert!(body.vertical_speed.abs() < 0.2);
    assert_eq!(body.submersion(&terrain, sim.water_level()), 1.0);
}

#[test]
fn buoyant_body_floats_at_the_surface() {
    init();
    let mut sim = Simulation::new();
    let terrain = FlatTerrain::default();
    let handle = sim
        .create_body(
            Vec2::zero(),
            BodyParams {
                altitude: Some(1.0),
                buoyancy: 0.5,
                ..BodyParams::default()
            },
        )
        .unwrap();

    for _ in 0..1200 {
        sim.tick(DT).unwrap();
    }

    let body = sim.get(handle).unwrap();
    let submersion = body.submersion(&terrain, sim.water_level());
    assert!(submersion > 0.2 && submersion < 0.8, "submersion {}", submersion);
    assert!(body.vertical_speed.abs() < 0.1);
}

#[test]
fn grounded_body_rests_and_slows() {
    init();
    let config = SimulationConfig::default();
    let mut sim = Simulation::with_terrain(Arc::new(FlatTerrain::new(5.0)), config);
    let handle = sim
        .create_body(
            Vec2::zero(),
            BodyParams {
                velocity: Vec2::new(3.0, 0.0),
                ..BodyParams::default()
            },
        )
        .unwrap();

    let mut last_speed = sim.get(handle).unwrap().velocity().mag();
    for _ in 0..300 {
        sim.tick(DT).unwrap();
        let body = sim.get(handle).unwrap();

        assert!(body.altitude >= 5.5 - 0.01);
        assert!(body.velocity().x >= 0.0);
        assert!(body.velocity().mag() <= last_speed + 1e-6);
        last_speed = body.velocity().mag();
    }
    assert!(last_speed < 3.0);
}

#[test]
fn cannonball_hits_ship_and_is_removed() {
    init();
    let mut sim = Simulation::new();
    let ship = sim.create_body(Vec2::zero(), ship_params(Vec2::zero(), 0.0)).unwrap();
    let ball = sim
        .create_body(
            Vec2::new(-40.0, 0.0),
            BodyParams {
                weight: 1.5,
                velocity: Vec2::new(300.0, 0.0),
                ..BodyParams::default()
            },
        )
        .unwrap();

    let mut hull = Hull::default();
    let mut hit = None;
    for _ in 0..120 {
        sim.tick(DT).unwrap();
        if !sim.contains(ball) {
            break;
        }

        let (shot, target) = sim.pair_mut(ball, ship).unwrap();
        if let Some(contact) = collision::resolve_projectile_hit(shot, target, SHIP_LCS) {
            contact.deliver(&mut hull);
            hit = Some(contact);
        }
    }

    let hit = hit.expect("the shot never connected");
    assert!(hit.damage > 0.0);
    assert!(hull.damage() > 0.0);
    assert!(damage_out_of_max(&hull) > 0.0);
    assert!(!sim.contains(ball));
    assert_eq!(sim.len(), 1);
    assert!(sim.get(ship).unwrap().velocity().x > 0.0);
}

#[test]
fn head_on_ships_bounce_symmetrically() {
    init();
    let mut sim = Simulation::new();
    let a = sim.create_body(Vec2::new(-40.0, 0.0), ship_params(Vec2::new(3.0, 0.0), 0.0)).unwrap();
    let b = sim
        .create_body(
            Vec2::new(40.0, 0.0),
            ship_params(Vec2::new(-3.0, 0.0), std::f32::consts::PI),
        )
        .unwrap();

    let mut hulls: HashMap<BodyHandle, Hull> = HashMap::new();
    let mut collided = false;
    for _ in 0..1200 {
        sim.tick(DT).unwrap();
        for (first, second, contact) in collision::resolve_hull_contacts(&mut sim, |_, body| ship_lcs(body)) {
            collided = true;
            let mut damage_first = Hull::default();
            let mut damage_second = Hull::default();
            contact.deliver(&mut damage_first, &mut damage_second);
            hulls.entry(first).or_default().points += damage_first.points;
            hulls.entry(second).or_default().points += damage_second.points;
        }
    }

    assert!(collided);
    let (va, vb) = (sim.get(a).unwrap().velocity(), sim.get(b).unwrap().velocity());
    assert!(va.x <= 1e-3);
    assert!(vb.x >= -1e-3);
    assert!((va.x + vb.x).abs() < 1e-3);
    assert!((hulls[&a].points - hulls[&b].points).abs() < 1e-3);
    assert!(hulls[&a].points > 0.0);

    let pa = sim.get(a).unwrap().pos();
    let pb = sim.get(b).unwrap().pos();
    assert!((pa.x + pb.x).abs() < 1e-2);
}

#[test]
fn explosion_scatters_bodies_outward() {
    init();
    let mut sim = Simulation::new();
    let center = Vec2::new(10.0, 10.0);
    let shell = sim.create_body(center, BodyParams::default()).unwrap();

    let mut around = Vec::new();
    for i in 0..8 {
        let angle = i as f32 / 8.0 * std::f32::consts::TAU;
        let offset = Vec2::new(angle.cos(), angle.sin()) * (20.0 + i as f32 * 10.0);
        around.push(sim.create_body(center + offset, BodyParams::default()).unwrap());
    }
    let distant = sim.create_body(Vec2::new(1000.0, 0.0), BodyParams::default()).unwrap();

    let mut damage = HashMap::new();
    let field = RadiusField::explosion(center, sim.water_level()).unwrap().same_layer().excluding(shell);
    let hits = field.apply(&mut sim, None, |_, _| true, |handle, amount| {
        *damage.entry(handle).or_insert(0.0) += amount;
    });
    sim.mark_dying(shell).unwrap();
    sim.tick(DT).unwrap();

    assert_eq!(hits.len(), around.len());
    assert!(!sim.contains(shell));
    for pair in around.windows(2) {
        assert!(damage[&pair[0]] > damage[&pair[1]]);
    }
    for handle in &around {
        let body = sim.get(*handle).unwrap();
        assert!(body.velocity().dot(body.pos() - center) > 0.0);
    }
    assert_eq!(sim.get(distant).unwrap().velocity(), Vec2::zero());
    assert!(!damage.contains_key(&distant));
}
