use seqflow::{EngineBuilder, SubscribeOptions, TriggerEvent, WorkflowModel};

fn main() {
    let engine = EngineBuilder::new().build().unwrap();

    engine.launch();

    let text = include_str!("./workflow.json");

    let workflow_model = WorkflowModel::from_json(text).unwrap();

    engine.deploy(&workflow_model).unwrap();

    engine.subscribe(SubscribeOptions::default()).on_status(|message| {
        println!("[{}] node {} is {}", message.channel, message.node_id, message.status);
    });

    let run = engine.trigger(TriggerEvent::new(workflow_model.id.as_str())).unwrap();

    loop {
        if run.is_complete() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    match run.outcome().unwrap() {
        Ok(context) => println!("Context: {}", context.to_json()),
        Err(err) => println!("Run failed: {}", err),
    }

    engine.shutdown();
}
