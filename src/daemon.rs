use anyhow::{bail, Context, Result};
use deltaq_lib::bms::BmsStatus;
use deltaq_lib::serialport::BmsClient;
use log::{error, info, warn};
use serde_json::json;
use std::collections::HashMap;

use crate::{commandline, mqtt};

/// One reportable view of a BMS status frame. The BMS answers a single poll
/// with everything it knows, so all metrics are extracted from the same
/// snapshot instead of issuing per-metric commands.
struct Metric {
    extract: fn(&BmsStatus) -> serde_json::Value,
}

fn get_metrics() -> HashMap<&'static str, Metric> {
    let mut metrics: HashMap<&'static str, Metric> = HashMap::new();
    metrics.insert(
        "status",
        Metric {
            extract: |s| {
                json!({
                    "pack_voltage_v": s.pack_voltage_v,
                    "pack_current_a": s.pack_current_a,
                    "soc_pct": s.soc_pct,
                    "charge_mos": s.charge_mos_status.to_string(),
                    "discharge_mos": s.discharge_mos_status.to_string(),
                    "balance": s.balance_status.to_string(),
                })
            },
        },
    );
    metrics.insert(
        "cells",
        Metric {
            extract: |s| {
                json!({
                    "cell_voltages_v": s.cell_voltages_v,
                    "high_cell_num": s.high_cell_num,
                    "high_cell_voltage_v": s.high_cell_voltage_v,
                    "low_cell_num": s.low_cell_num,
                    "low_cell_voltage_v": s.low_cell_voltage_v,
                })
            },
        },
    );
    metrics.insert(
        "temperatures",
        Metric {
            extract: |s| {
                json!({
                    "mos_temperature_raw": s.mos_temperature_raw,
                    "balance_temperature_raw": s.balance_temperature_raw,
                    "external_temperatures_raw": s.external_temperatures_raw,
                })
            },
        },
    );
    metrics.insert(
        "capacity",
        Metric {
            extract: |s| {
                json!({
                    "physical_capacity_ah": s.physical_capacity_ah,
                    "remaining_capacity_ah": s.remaining_capacity_ah,
                    "cyclic_capacity_ah": s.cyclic_capacity_ah,
                })
            },
        },
    );
    metrics
}

fn publish_simple_format(
    publisher: &mqtt::MqttPublisher,
    base_topic: &str,
    metric_name: &str,
    value: &serde_json::Value,
) {
    fn publish_recursive(publisher: &mqtt::MqttPublisher, topic: &str, val: &serde_json::Value) {
        match val {
            serde_json::Value::Object(map) => {
                for (k, v) in map {
                    let sub_topic = format!("{topic}/{k}");
                    publish_recursive(publisher, &sub_topic, v);
                }
            }
            serde_json::Value::Array(arr) => {
                for (i, v) in arr.iter().enumerate() {
                    let sub_topic = format!("{topic}/{i}");
                    publish_recursive(publisher, &sub_topic, v);
                }
            }
            serde_json::Value::String(s) => {
                if let Err(e) = publisher.publish(topic, s) {
                    error!("Failed to publish message to topic {topic}: {e}");
                }
            }
            serde_json::Value::Number(n) => {
                if let Err(e) = publisher.publish(topic, &n.to_string()) {
                    error!("Failed to publish message to topic {topic}: {e}");
                }
            }
            serde_json::Value::Bool(b) => {
                if let Err(e) = publisher.publish(topic, &b.to_string()) {
                    error!("Failed to publish message to topic {topic}: {e}");
                }
            }
            serde_json::Value::Null => {
                // Do not publish null values
            }
        }
    }
    let root_topic = format!("{base_topic}/{metric_name}");
    publish_recursive(publisher, &root_topic, value);
}

pub fn run(
    mut bms: BmsClient,
    output: commandline::DaemonOutput,
    interval: std::time::Duration,
    metrics_to_fetch: Vec<String>,
) -> Result<()> {
    info!(
        "Starting daemon mode: output={output:?}, interval={interval:?}, metrics={metrics_to_fetch:?}"
    );
    let available_metrics = get_metrics();

    let mut metrics_to_process = metrics_to_fetch;
    if metrics_to_process.iter().any(|m| m == "all") {
        info!("Reporting all metrics due to 'all' flag.");
        metrics_to_process = available_metrics.keys().map(|s| s.to_string()).collect();
    }
    for metric_name in &metrics_to_process {
        if !available_metrics.contains_key(metric_name.as_str()) {
            bail!("Unknown metric name '{}'", metric_name);
        }
    }

    let mut mqtt_publisher: Option<mqtt::MqttPublisher> = None;

    if let commandline::DaemonOutput::Mqtt { config_file, .. } = &output {
        let config = mqtt::MqttConfig::load(config_file)
            .with_context(|| format!("Failed to open MQTT config file at '{config_file}'"))?;
        info!("Successfully loaded MQTT config from {config_file}: {config:?}");
        let publisher =
            mqtt::MqttPublisher::new(config).with_context(|| "Failed to create MQTT publisher")?;
        info!("MQTT Publisher created successfully.");
        mqtt_publisher = Some(publisher);
    }

    loop {
        let status = match bms.get_status() {
            Ok(status) => status,
            Err(e) => {
                error!("Error polling BMS: {e}");
                std::thread::sleep(interval);
                continue;
            }
        };

        let mut reported: Vec<(&str, serde_json::Value)> = Vec::new();
        for metric_name in &metrics_to_process {
            if let Some(metric) = available_metrics.get(metric_name.as_str()) {
                reported.push((metric_name.as_str(), (metric.extract)(&status)));
            }
        }

        match &output {
            commandline::DaemonOutput::Console => {
                println!("--- Data at {} ---", chrono::Local::now().to_rfc3339());
                for (name, value) in &reported {
                    println!("{name}: {value}");
                }
                println!("--------------------------");
            }
            commandline::DaemonOutput::Mqtt { format, .. } => {
                if let Some(publisher) = &mqtt_publisher {
                    match format {
                        commandline::MqttFormat::Json => {
                            let mut data_to_publish = serde_json::Map::new();
                            data_to_publish.insert(
                                "timestamp".to_string(),
                                json!(chrono::Utc::now().to_rfc3339()),
                            );
                            for (name, value) in reported {
                                data_to_publish.insert(name.to_string(), value);
                            }

                            match serde_json::to_string(&data_to_publish) {
                                Ok(json_payload) => {
                                    if let Err(e) =
                                        publisher.publish(publisher.topic(), &json_payload)
                                    {
                                        error!("Failed to publish data to MQTT: {e:?}");
                                    }
                                }
                                Err(e) => {
                                    error!("Failed to serialize data to JSON string: {e}");
                                }
                            }
                        }
                        commandline::MqttFormat::Simple => {
                            let base_topic = publisher.topic();
                            for (name, value) in &reported {
                                publish_simple_format(publisher, base_topic, name, value);
                            }
                        }
                    }
                } else {
                    warn!(
                        "MQTT output selected, but publisher is not initialized. Skipping publish."
                    );
                }
            }
        }
        std::thread::sleep(interval);
    }
}
