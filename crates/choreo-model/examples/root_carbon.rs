//! Root carbon and growth demo.
//!
//! Two components share the `root` compartment: a carbon balance that
//! unloads sucrose into hexose and respires it with a soil-temperature
//! response, and a growth model that elongates apices and adds a segment
//! once an apex is long enough. Run with `RUST_LOG=debug` for the
//! scheduler's events.
//!
//! ```text
//! cargo run -p choreo-model --example root_carbon
//! ```

use choreo_core::{EntityId, StateKind, VariableDecl};
use choreo_model::{
    BindingConfig, Component, Coupling, ModelBinding, RegistrationTable, Scenario,
    TemperatureResponse,
};
use choreo_schedule::{Scheduler, SchedulerConfig};
use choreo_store::{Attributes, PropertyStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

struct RootCarbon {
    unloading_rate: f64,
    respiration: TemperatureResponse,
    soil_temperature: f64,
}

impl Component for RootCarbon {
    fn family(&self) -> &str {
        "RootCarbon"
    }

    fn variables(&self) -> Vec<VariableDecl> {
        vec![
            VariableDecl::input("sucrose", 0.2).unit("mol.g-1").provided_by("Shoot"),
            VariableDecl::state("hexose", StateKind::MassicConcentration, 0.01).unit("mol.g-1"),
            VariableDecl::state("unloading", StateKind::Intensive, 0.0).unit("mol.g-1.s-1"),
            VariableDecl::state("respired", StateKind::Intensive, 0.0).unit("mol.g-1.s-1"),
            VariableDecl::plant_scale("total_hexose", 0.0).unit("mol"),
            VariableDecl::parameter("unloading_rate", 1e-3).bounds(Some(0.0), None),
            VariableDecl::parameter("soil_temperature", 15.0).unit("degC"),
        ]
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> bool {
        match name {
            "unloading_rate" => self.unloading_rate = value,
            "soil_temperature" => self.soil_temperature = value,
            _ => return false,
        }
        true
    }

    fn register(&self, table: &mut RegistrationTable) {
        let k = self.unloading_rate;
        table.add(
            table
                .functor("_unloading")
                .inputs(["sucrose"])
                .scalar(move |x| k * x[0]),
            &["rate"],
        );

        let respiration = TemperatureResponse {
            process_at_t_ref: 5e-4,
            t_ref: 20.0,
            ..self.respiration
        }
        .modify(self.soil_temperature);
        table.add(
            table
                .functor("_respired")
                .inputs(["hexose"])
                .scalar(move |x| respiration * x[0]),
            &["rate"],
        );

        table.add(
            table
                .functor("_hexose")
                .inputs(["hexose", "unloading", "respired"])
                .scalar(|x| (x[0] + x[1] - x[2]).max(0.0)),
            &["state"],
        );

        table.add(
            table.functor("_total_hexose").sweep(|ctx| {
                let total: f64 = ctx
                    .focus()
                    .iter()
                    .filter_map(|&id| ctx.store().get("hexose", id))
                    .sum();
                ctx.store_mut().declare_aggregate("total_hexose", total);
                Ok(())
            }),
            &["stepinit"],
        );
    }
}

struct RootGrowth {
    elongation: f64,
    segment_length: f64,
}

impl Component for RootGrowth {
    fn family(&self) -> &str {
        "RootGrowth"
    }

    fn variables(&self) -> Vec<VariableDecl> {
        vec![
            VariableDecl::input("growth_hexose", 0.0).provided_by("RootCarbon"),
            VariableDecl::state("length", StateKind::Extensive, 1e-3).unit("m"),
        ]
    }

    fn register(&self, table: &mut RegistrationTable) {
        let elongation = self.elongation;
        table.add(
            table.functor("_length").sweep(move |ctx| {
                let apices: Vec<EntityId> = ctx
                    .focus()
                    .iter()
                    .copied()
                    .filter(|&id| {
                        ctx.store()
                            .attributes(id)
                            .and_then(|a| a.get("label"))
                            .is_some_and(|l| l == "Apex")
                    })
                    .collect();
                let store = ctx.store_mut();
                for id in apices {
                    let hexose = store.get("growth_hexose", id).unwrap_or(0.0);
                    let length = store.get("length", id).unwrap_or(0.0);
                    store.set("length", id, length + elongation * hexose)?;
                }
                Ok(())
            }),
            &["potential", "actual"],
        );

        let threshold = self.segment_length;
        table.add(
            table.functor("_segmentation").sweep(move |ctx| {
                let store = ctx.store_mut();
                let long: Vec<EntityId> = store
                    .entity_ids()
                    .iter()
                    .copied()
                    .filter(|&id| store.get("length", id).is_some_and(|l| l > threshold))
                    .collect();
                for apex in long {
                    let next = store
                        .entity_ids()
                        .last()
                        .map_or(1, |id| id.0 + 1);
                    store.set_attribute(apex, "label", "Segment")?;
                    store.add_entity(EntityId(next), organ("Apex"))?;
                    store.set("length", apex, threshold)?;
                }
                Ok(())
            }),
            &["segmentation"],
        );
    }
}

fn organ(label: &str) -> Attributes {
    let mut a = Attributes::new();
    a.insert("label".into(), label.into());
    a.insert("type".into(), "Normal_root_after_emergence".into());
    a
}

fn initial_root() -> PropertyStore {
    let mut store = PropertyStore::new();
    for (id, label) in [(1, "Segment"), (2, "Segment"), (3, "Apex")] {
        if let Err(e) = store.add_entity(EntityId(id), organ(label)) {
            tracing::error!(%e, "initial root");
        }
    }
    store
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let mut scheduler = Scheduler::new(SchedulerConfig {
        global_step: Some(3600),
        ..Default::default()
    })?;

    let mut scenario = Scenario::new();
    scenario.insert("soil_temperature".into(), 12.0);
    let mut carbon = ModelBinding::bind(
        RootCarbon {
            unloading_rate: 1e-3,
            respiration: TemperatureResponse::default(),
            soil_temperature: 15.0,
        },
        &mut scheduler,
        initial_root(),
        BindingConfig {
            sub_step: 1200,
            scenario,
            ..Default::default()
        },
    )?;
    let mut growth = ModelBinding::bind(
        RootGrowth {
            elongation: 0.5,
            segment_length: 3e-3,
        },
        &mut scheduler,
        PropertyStore::new(),
        BindingConfig {
            structural: true,
            couplings: vec![Coupling::new("growth_hexose").source("hexose", 1.0)],
            ..Default::default()
        },
    )?;

    info!("{}", carbon.documentation(&[]));
    for (priority, names) in scheduler.priority_groups("RootCarbon") {
        info!(%priority, ?names, "carbon group");
    }

    for hour in 0..24 {
        let c = carbon.step(&mut scheduler)?;
        let g = growth.step(&mut scheduler)?;
        let store = scheduler.store("root").ok_or("root store missing")?;
        info!(
            hour,
            entities = store.entity_count(),
            focus = g.focus_len,
            total_hexose = store.aggregate("total_hexose").unwrap_or(0.0),
            carbon_us = c.total_us,
            "hour simulated"
        );
    }
    Ok(())
}
