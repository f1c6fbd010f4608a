#![allow(dead_code)]

use std::{any::Any, sync::Arc};

use parking_lot::Mutex;
use sprig::{
    CaptureConsole, ClassRegistry, HostClass, HostException, HostField, HostMethod, HostObject,
    HostType, InterfaceAdapter, Interpreter, InterpreterConfig, Value,
};

#[derive(Debug, thiserror::Error)]
#[error("boom: {0}")]
pub struct Boom(pub String);

/// Host widget scripts create with `new Button(label)` and attach listeners to.
#[derive(Debug, Default)]
pub struct Button {
    pub label: Mutex<String>,
    pub listeners: Mutex<Vec<Value>>,
    pub clicks: Mutex<i32>,
}

impl Button {
    pub fn new(label: &str) -> Self {
        Self {
            label: Mutex::new(label.to_string()),
            ..Self::default()
        }
    }
}

impl HostObject for Button {
    fn class_name(&self) -> &str {
        "ui.Button"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn button(receiver: Option<&Value>) -> Result<&Button, HostException> {
    receiver
        .and_then(|value| value.downcast_host::<Button>())
        .ok_or_else(|| HostException::msg("receiver is not a button"))
}

pub fn button_class() -> HostClass {
    HostClass::new("ui.Button")
        .constructor(vec![HostType::String], |args| {
            let label = args[0].as_str().unwrap_or_default();
            Ok(Value::from_host(Button::new(label)))
        })
        .field(
            HostField::new("label", |receiver| {
                Ok(Value::string(button(receiver)?.label.lock().clone()))
            })
            .with_setter(|receiver, value| {
                *button(receiver)?.label.lock() = value.to_string();
                Ok(())
            }),
        )
        .method(HostMethod::new(
            "addActionListener",
            vec![HostType::class("ui.ActionListener")],
            |receiver, args| {
                button(receiver)?.listeners.lock().push(args[0].clone());
                Ok(Value::void())
            },
        ))
        .method(HostMethod::new("click", vec![], |receiver, _| {
            let button = button(receiver)?;
            *button.clicks.lock() += 1;
            let listeners = button.listeners.lock().clone();
            for listener in listeners {
                let adapter = listener
                    .downcast_host::<InterfaceAdapter>()
                    .ok_or_else(|| HostException::msg("listener is not scripted"))?;
                adapter
                    .invoke("actionPerformed", &[Value::string("click")])
                    .map_err(HostException::new)?;
            }
            Ok(Value::void())
        }))
        .method(HostMethod::new("getClicks", vec![], |receiver, _| {
            Ok(Value::from(*button(receiver)?.clicks.lock()))
        }))
        .method(HostMethod::new("fail", vec![HostType::String], |_, args| {
            Err(HostException::new(Boom(args[0].to_string())))
        }))
}

/// Static overload table used to observe which signature dispatch picked.
pub fn greeter_class() -> HostClass {
    let describe = |param: HostType, label: &'static str| {
        HostMethod::new_static("describe", vec![param], move |_| Ok(Value::string(label)))
    };
    HostClass::new("ui.Greeter")
        .method(describe(HostType::Primitive(sprig::PrimitiveKind::Int), "int"))
        .method(describe(HostType::Primitive(sprig::PrimitiveKind::Long), "long"))
        .method(describe(HostType::Primitive(sprig::PrimitiveKind::Double), "double"))
        .method(describe(HostType::String, "String"))
        .method(describe(HostType::Object, "Object"))
        .method(HostMethod::new_static(
            "pick",
            vec![
                HostType::Primitive(sprig::PrimitiveKind::Int),
                HostType::Primitive(sprig::PrimitiveKind::Long),
            ],
            |_| Ok(Value::string("int,long")),
        ))
        .method(HostMethod::new_static(
            "pick",
            vec![
                HostType::Primitive(sprig::PrimitiveKind::Long),
                HostType::Primitive(sprig::PrimitiveKind::Int),
            ],
            |_| Ok(Value::string("long,int")),
        ))
        .method(HostMethod::new_static("secret", vec![], |_| Ok(Value::string("hidden"))).inaccessible())
        .field(HostField::constant("GREETING", "hello").make_static())
}

pub fn register(classes: &ClassRegistry) {
    classes.register(button_class());
    classes.register(greeter_class());
    classes.register(
        HostClass::interface("ui.ActionListener")
            .method(HostMethod::abstract_method("actionPerformed", vec![HostType::Object])),
    );
    classes.register(
        HostClass::interface("ui.ClickListener")
            .method(HostMethod::abstract_method("onClick", vec![HostType::Object])),
    );
    classes.register(HostClass::interface("ui.Runnable").method(HostMethod::abstract_method("run", vec![])));
    classes.register(
        HostClass::interface("ui.Task")
            .implements("ui.Runnable")
            .method(HostMethod::abstract_method("name", vec![])),
    );
}

/// Interpreter with the `ui` fixtures registered and console output captured.
pub fn interpreter() -> (Interpreter, Arc<CaptureConsole>) {
    with_config(InterpreterConfig::default())
}

pub fn with_config(config: InterpreterConfig) -> (Interpreter, Arc<CaptureConsole>) {
    let console = Arc::new(CaptureConsole::new());
    let interpreter = Interpreter::with_config(config, console.clone());
    register(interpreter.runtime().classes());
    (interpreter, console)
}
