//! Deterministic engine implementation.
//!
//! `StubEngine` implements the [`Engine`] seam without a production script
//! engine behind it. Objects, byte arrays, promises, and native functions
//! behave normally; module *source* is not executed but scanned for a small
//! surface that the loader and the test suite rely on:
//!
//! - `import ... from "<specifier>";` records a dependency edge,
//! - `export const <name> = <literal>;` records a namespace export
//!   (integer, float, quoted string, `true`, `false`, `null` literals),
//! - the directive comment `// @fail: parse` makes compilation fail,
//! - `// @fail: evaluate <msg>` makes evaluation fail with a stack trace,
//! - `// @emit: unhandled-rejection <msg>` leaves behind a rejected promise
//!   with no handler attached.
//!
//! Collection is explicit: [`Engine::collect_garbage`] finalizes every
//! finalizer-bearing object that is not pinned persistent.
//!
//! [`EngineConfig`] is honored where the stub has a behavior to attach it
//! to: with `auto_microtasks` set, the microtask queue drains at the end of
//! every outermost function call and module evaluation (the embedder's
//! explicit [`Engine::run_microtasks`] remains available either way), and
//! exception stacks crossing the call boundary are clamped to
//! `stack_trace_limit` frames. `heap_limit` is forwarded to a real engine's
//! isolate parameters; the stub does not model heap pressure.

use crate::engine::{
    Engine, EngineConfig, FinalizerPayload, Microtask, ModuleResolver, NativeFn, PromiseState,
    RejectionEvent, ResolverId, TemplateId,
};
use core_types::{ExceptionKind, JsException, ObjectId, ScriptId, ScriptValue, StackFrame};
use std::collections::VecDeque;
use tracing::trace;

enum CellKind {
    Object,
    Array(Vec<ScriptValue>),
    Bytes(Vec<u8>),
    Promise(PromiseCell),
    Function(Option<NativeFn>),
}

struct PromiseCell {
    state: PromiseState,
    handled: bool,
}

struct HeapCell {
    kind: CellKind,
    class: Option<String>,
    props: Vec<(String, ScriptValue)>,
    finalizer: Option<FinalizerPayload>,
    pins: u32,
}

impl HeapCell {
    fn plain(kind: CellKind) -> Self {
        Self {
            kind,
            class: None,
            props: Vec::new(),
            finalizer: None,
            pins: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModuleStatus {
    Unlinked,
    Linking,
    Linked,
    Evaluated,
    Error,
}

struct ModuleCell {
    origin: String,
    status: ModuleStatus,
    imports: Vec<String>,
    deps: Vec<ScriptId>,
    exports: Vec<(String, ScriptValue)>,
    namespace: Option<ObjectId>,
    fail_evaluate: Option<String>,
    unhandled_rejection: Option<String>,
}

/// Deterministic [`Engine`] implementation used by the CLI wiring and tests.
#[derive(Default)]
pub struct StubEngine {
    config: EngineConfig,
    heap: Vec<HeapCell>,
    templates: Vec<String>,
    resolvers: Vec<ObjectId>,
    modules: Vec<ModuleCell>,
    microtasks: VecDeque<Microtask>,
    rejection_events: Vec<RejectionEvent>,
    finalized: Vec<FinalizerPayload>,
    scope_depth: usize,
    times_entered: usize,
    call_depth: usize,
}

impl StubEngine {
    /// Creates an engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Current scope nesting depth.
    pub fn scope_depth(&self) -> usize {
        self.scope_depth
    }

    /// How many times the engine has been entered.
    pub fn times_entered(&self) -> usize {
        self.times_entered
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn alloc(&mut self, cell: HeapCell) -> ObjectId {
        self.heap.push(cell);
        (self.heap.len() - 1) as ObjectId
    }

    fn cell(&self, id: ObjectId) -> Option<&HeapCell> {
        self.heap.get(id as usize)
    }

    fn cell_mut(&mut self, id: ObjectId) -> Option<&mut HeapCell> {
        self.heap.get_mut(id as usize)
    }

    fn clamp_stack(&self, mut exception: JsException) -> JsException {
        exception.stack.truncate(self.config.stack_trace_limit);
        exception
    }

    fn new_rejected_promise(&mut self, value: ScriptValue) -> ObjectId {
        let oid = self.alloc(HeapCell::plain(CellKind::Promise(PromiseCell {
            state: PromiseState::Rejected(value.clone()),
            handled: false,
        })));
        self.rejection_events
            .push(RejectionEvent::Unhandled { promise: oid, value });
        oid
    }

    fn scan_module(origin: &str, source: &str) -> Result<ModuleCell, JsException> {
        let mut cell = ModuleCell {
            origin: origin.to_string(),
            status: ModuleStatus::Unlinked,
            imports: Vec::new(),
            deps: Vec::new(),
            exports: Vec::new(),
            namespace: None,
            fail_evaluate: None,
            unhandled_rejection: None,
        };

        for (lineno, raw) in source.lines().enumerate() {
            let line = raw.trim();
            if let Some(rest) = line.strip_prefix("// @fail: evaluate") {
                cell.fail_evaluate = Some(rest.trim().to_string());
            } else if line.starts_with("// @fail: parse") {
                let mut exc = JsException::new(ExceptionKind::SyntaxError, "unexpected token");
                exc.stack.push(StackFrame {
                    function_name: None,
                    source: Some(origin.to_string()),
                    line: (lineno + 1) as u32,
                    column: 1,
                });
                return Err(exc);
            } else if let Some(rest) = line.strip_prefix("// @emit: unhandled-rejection") {
                cell.unhandled_rejection = Some(rest.trim().to_string());
            } else if line.starts_with("import ") || line.starts_with("import\"") {
                match extract_specifier(line) {
                    Some(spec) => cell.imports.push(spec),
                    None => {
                        let mut exc =
                            JsException::new(ExceptionKind::SyntaxError, "malformed import");
                        exc.stack.push(StackFrame {
                            function_name: None,
                            source: Some(origin.to_string()),
                            line: (lineno + 1) as u32,
                            column: 1,
                        });
                        return Err(exc);
                    }
                }
            } else if let Some(rest) = line.strip_prefix("export const ") {
                if let Some((name, value)) = parse_export(rest) {
                    cell.exports.push((name, value));
                }
            }
        }
        Ok(cell)
    }
}

/// Pulls the quoted specifier out of an import line.
fn extract_specifier(line: &str) -> Option<String> {
    let quote = line.find(['"', '\''])?;
    let delim = line.as_bytes()[quote] as char;
    let rest = &line[quote + 1..];
    let end = rest.find(delim)?;
    Some(rest[..end].to_string())
}

/// Parses `NAME = <literal>;`, returning `Undefined` for non-literal values.
fn parse_export(rest: &str) -> Option<(String, ScriptValue)> {
    let eq = rest.find('=')?;
    let name = rest[..eq].trim().to_string();
    if name.is_empty() {
        return None;
    }
    let raw = rest[eq + 1..].trim().trim_end_matches(';').trim();
    let value = if raw == "true" {
        ScriptValue::Boolean(true)
    } else if raw == "false" {
        ScriptValue::Boolean(false)
    } else if raw == "null" {
        ScriptValue::Null
    } else if (raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2)
        || (raw.starts_with('\'') && raw.ends_with('\'') && raw.len() >= 2)
    {
        ScriptValue::String(raw[1..raw.len() - 1].to_string())
    } else if let Some(digits) = raw.strip_suffix('n') {
        match digits.parse::<num_bigint::BigInt>() {
            Ok(n) => ScriptValue::BigInt(n),
            Err(_) => ScriptValue::Undefined,
        }
    } else if let Ok(n) = raw.parse::<i32>() {
        ScriptValue::Int(n)
    } else if let Ok(f) = raw.parse::<f64>() {
        ScriptValue::Number(f)
    } else {
        ScriptValue::Undefined
    };
    Some((name, value))
}

impl Engine for StubEngine {
    fn enter(&mut self) {
        self.scope_depth += 1;
        self.times_entered += 1;
    }

    fn exit(&mut self) {
        debug_assert!(self.scope_depth > 0, "unbalanced engine exit");
        self.scope_depth = self.scope_depth.saturating_sub(1);
    }

    fn new_object(&mut self) -> ScriptValue {
        ScriptValue::Object(self.alloc(HeapCell::plain(CellKind::Object)))
    }

    fn register_template(&mut self, class_name: &str) -> TemplateId {
        if let Some(pos) = self.templates.iter().position(|t| t == class_name) {
            return pos as TemplateId;
        }
        self.templates.push(class_name.to_string());
        (self.templates.len() - 1) as TemplateId
    }

    fn new_instance(&mut self, template: TemplateId) -> ScriptValue {
        let class = self.templates.get(template as usize).cloned();
        let mut cell = HeapCell::plain(CellKind::Object);
        cell.class = class;
        ScriptValue::Object(self.alloc(cell))
    }

    fn class_of(&self, value: &ScriptValue) -> Option<String> {
        self.cell(value.heap_id()?)?.class.clone()
    }

    fn set_property(&mut self, object: &ScriptValue, key: &str, value: ScriptValue) {
        let Some(cell) = object.heap_id().and_then(|id| self.cell_mut(id)) else {
            return;
        };
        if let Some(entry) = cell.props.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value;
        } else {
            cell.props.push((key.to_string(), value));
        }
    }

    fn get_property(&self, object: &ScriptValue, key: &str) -> Option<ScriptValue> {
        let cell = self.cell(object.heap_id()?)?;
        cell.props
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn property_names(&self, object: &ScriptValue) -> Vec<String> {
        object
            .heap_id()
            .and_then(|id| self.cell(id))
            .map(|cell| cell.props.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }

    fn new_array(&mut self, items: Vec<ScriptValue>) -> ScriptValue {
        ScriptValue::Object(self.alloc(HeapCell::plain(CellKind::Array(items))))
    }

    fn array_items(&self, value: &ScriptValue) -> Option<Vec<ScriptValue>> {
        match &self.cell(value.heap_id()?)?.kind {
            CellKind::Array(items) => Some(items.clone()),
            _ => None,
        }
    }

    fn new_byte_array(&mut self, bytes: &[u8]) -> ScriptValue {
        ScriptValue::Bytes(self.alloc(HeapCell::plain(CellKind::Bytes(bytes.to_vec()))))
    }

    fn byte_array(&self, value: &ScriptValue) -> Option<&[u8]> {
        match &self.cell(value.heap_id()?)?.kind {
            CellKind::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    fn new_error(&mut self, message: &str) -> ScriptValue {
        let mut cell = HeapCell::plain(CellKind::Object);
        cell.class = Some("Error".to_string());
        cell.props
            .push(("message".to_string(), ScriptValue::String(message.into())));
        ScriptValue::Object(self.alloc(cell))
    }

    fn new_function(&mut self, f: NativeFn) -> ScriptValue {
        ScriptValue::Function(self.alloc(HeapCell::plain(CellKind::Function(Some(f)))))
    }

    fn call(
        &mut self,
        function: &ScriptValue,
        args: Vec<ScriptValue>,
    ) -> Result<ScriptValue, JsException> {
        let id = function.heap_id().ok_or_else(|| {
            JsException::new(ExceptionKind::TypeError, "value is not a function")
        })?;
        let mut f = match self.cell_mut(id) {
            Some(HeapCell {
                kind: CellKind::Function(slot),
                ..
            }) => slot.take().ok_or_else(|| {
                JsException::new(ExceptionKind::InternalError, "function is re-entered")
            })?,
            _ => {
                return Err(JsException::new(
                    ExceptionKind::TypeError,
                    "value is not a function",
                ))
            }
        };
        self.call_depth += 1;
        let result = f(self, args);
        if let Some(HeapCell {
            kind: CellKind::Function(slot),
            ..
        }) = self.cell_mut(id)
        {
            *slot = Some(f);
        }
        self.call_depth = self.call_depth.saturating_sub(1);
        // Microtask checkpoint: with the automatic policy, the queue drains
        // once the outermost call returns.
        if self.call_depth == 0 && self.config.auto_microtasks {
            self.run_microtasks();
        }
        result.map_err(|exception| self.clamp_stack(exception))
    }

    fn new_resolver(&mut self) -> ResolverId {
        let oid = self.alloc(HeapCell::plain(CellKind::Promise(PromiseCell {
            state: PromiseState::Pending,
            handled: false,
        })));
        self.resolvers.push(oid);
        (self.resolvers.len() - 1) as ResolverId
    }

    fn resolver_promise(&self, id: ResolverId) -> ScriptValue {
        ScriptValue::Promise(self.resolvers[id as usize])
    }

    fn resolve(&mut self, id: ResolverId, value: ScriptValue) {
        let oid = self.resolvers[id as usize];
        if let Some(HeapCell {
            kind: CellKind::Promise(p),
            ..
        }) = self.cell_mut(oid)
        {
            if p.state == PromiseState::Pending {
                p.state = PromiseState::Fulfilled(value);
            }
        }
    }

    fn reject(&mut self, id: ResolverId, value: ScriptValue) {
        let oid = self.resolvers[id as usize];
        let mut emit = None;
        if let Some(HeapCell {
            kind: CellKind::Promise(p),
            ..
        }) = self.cell_mut(oid)
        {
            if p.state == PromiseState::Pending {
                p.state = PromiseState::Rejected(value.clone());
                if !p.handled {
                    emit = Some(RejectionEvent::Unhandled {
                        promise: oid,
                        value,
                    });
                }
            }
        }
        if let Some(event) = emit {
            self.rejection_events.push(event);
        }
    }

    fn promise_state(&self, value: &ScriptValue) -> Option<PromiseState> {
        match &self.cell(value.heap_id()?)?.kind {
            CellKind::Promise(p) => Some(p.state.clone()),
            _ => None,
        }
    }

    fn attach_rejection_handler(&mut self, promise: &ScriptValue) {
        let Some(oid) = promise.heap_id() else { return };
        let mut emit = false;
        if let Some(HeapCell {
            kind: CellKind::Promise(p),
            ..
        }) = self.cell_mut(oid)
        {
            if !p.handled {
                p.handled = true;
                emit = matches!(p.state, PromiseState::Rejected(_));
            }
        }
        if emit {
            self.rejection_events
                .push(RejectionEvent::HandlerAdded { promise: oid });
        }
    }

    fn enqueue_microtask(&mut self, task: Microtask) {
        self.microtasks.push_back(task);
    }

    fn run_microtasks(&mut self) {
        while let Some(task) = self.microtasks.pop_front() {
            task(self);
        }
    }

    fn has_pending_microtasks(&self) -> bool {
        !self.microtasks.is_empty()
    }

    fn drain_rejection_events(&mut self) -> Vec<RejectionEvent> {
        std::mem::take(&mut self.rejection_events)
    }

    fn compile_module(&mut self, origin: &str, source: &str) -> Result<ScriptId, JsException> {
        let cell =
            Self::scan_module(origin, source).map_err(|exception| self.clamp_stack(exception))?;
        trace!(origin, imports = cell.imports.len(), "module compiled");
        self.modules.push(cell);
        Ok((self.modules.len() - 1) as ScriptId)
    }

    fn instantiate_module(
        &mut self,
        id: ScriptId,
        resolver: ModuleResolver<'_>,
    ) -> Result<(), String> {
        let status = match self.modules.get(id as usize) {
            Some(m) => m.status,
            None => return Err(format!("unknown module id {}", id)),
        };
        match status {
            ModuleStatus::Linked | ModuleStatus::Evaluated => return Ok(()),
            ModuleStatus::Linking => return Ok(()), // cycle; the graph is already being linked
            ModuleStatus::Error => return Err("module is in error state".to_string()),
            ModuleStatus::Unlinked => {}
        }
        self.modules[id as usize].status = ModuleStatus::Linking;

        let imports = self.modules[id as usize].imports.clone();
        let mut deps = Vec::with_capacity(imports.len());
        for spec in &imports {
            match resolver(self, id, spec) {
                Ok(dep) => deps.push(dep),
                Err(exc) => {
                    self.modules[id as usize].status = ModuleStatus::Error;
                    return Err(exc.render());
                }
            }
        }
        for dep in &deps {
            self.instantiate_module(*dep, resolver)?;
        }
        let cell = &mut self.modules[id as usize];
        cell.deps = deps;
        cell.status = ModuleStatus::Linked;
        Ok(())
    }

    fn evaluate_module(&mut self, id: ScriptId) -> Result<ScriptValue, String> {
        let status = match self.modules.get(id as usize) {
            Some(m) => m.status,
            None => return Err(format!("unknown module id {}", id)),
        };
        match status {
            ModuleStatus::Evaluated => return Ok(ScriptValue::Undefined),
            ModuleStatus::Linked => {}
            ModuleStatus::Error => return Err("module is in error state".to_string()),
            _ => return Err("module is not instantiated".to_string()),
        }

        let deps = self.modules[id as usize].deps.clone();
        for dep in deps {
            self.evaluate_module(dep)?;
        }

        if let Some(msg) = self.modules[id as usize].fail_evaluate.clone() {
            let origin = self.modules[id as usize].origin.clone();
            self.modules[id as usize].status = ModuleStatus::Error;
            return Err(format!("Error: {}\n    at {}:1:1", msg, origin));
        }
        if let Some(msg) = self.modules[id as usize].unhandled_rejection.clone() {
            self.new_rejected_promise(ScriptValue::String(msg));
        }

        let exports = self.modules[id as usize].exports.clone();
        let ns = match self.new_object() {
            ScriptValue::Object(oid) => oid,
            _ => unreachable!(),
        };
        for (name, value) in exports {
            self.set_property(&ScriptValue::Object(ns), &name, value);
        }
        let cell = &mut self.modules[id as usize];
        cell.namespace = Some(ns);
        cell.status = ModuleStatus::Evaluated;
        // Microtask checkpoint after module evaluation, as after calls.
        if self.config.auto_microtasks {
            self.run_microtasks();
        }
        Ok(ScriptValue::Undefined)
    }

    fn module_namespace(&self, id: ScriptId) -> Option<ScriptValue> {
        self.modules
            .get(id as usize)
            .and_then(|m| m.namespace)
            .map(ScriptValue::Object)
    }

    fn set_finalizer(&mut self, object: &ScriptValue, payload: FinalizerPayload) {
        if let Some(cell) = object.heap_id().and_then(|id| self.cell_mut(id)) {
            cell.finalizer = Some(payload);
        }
    }

    fn make_persistent(&mut self, value: &ScriptValue) {
        if let Some(cell) = value.heap_id().and_then(|id| self.cell_mut(id)) {
            cell.pins += 1;
        }
    }

    fn release_persistent(&mut self, value: &ScriptValue) {
        if let Some(cell) = value.heap_id().and_then(|id| self.cell_mut(id)) {
            cell.pins = cell.pins.saturating_sub(1);
        }
    }

    fn collect_garbage(&mut self) {
        let mut reclaimed = 0usize;
        for cell in &mut self.heap {
            if cell.pins == 0 {
                if let Some(payload) = cell.finalizer.take() {
                    self.finalized.push(payload);
                    reclaimed += 1;
                }
            }
        }
        trace!(reclaimed, "collection cycle finished");
    }

    fn take_finalized(&mut self) -> Vec<FinalizerPayload> {
        std::mem::take(&mut self.finalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objects_hold_properties_in_insertion_order() {
        let mut engine = StubEngine::default();
        let obj = engine.new_object();
        engine.set_property(&obj, "b", ScriptValue::Int(2));
        engine.set_property(&obj, "a", ScriptValue::Int(1));
        assert_eq!(engine.property_names(&obj), vec!["b", "a"]);
        assert_eq!(engine.get_property(&obj, "a"), Some(ScriptValue::Int(1)));
    }

    #[test]
    fn template_instances_report_their_class() {
        let mut engine = StubEngine::default();
        let template = engine.register_template("HttpResponse");
        let instance = engine.new_instance(template);
        assert_eq!(engine.class_of(&instance).as_deref(), Some("HttpResponse"));
    }

    #[test]
    fn byte_arrays_preserve_contents() {
        let mut engine = StubEngine::default();
        let bytes = engine.new_byte_array(&[0x61, 0x62]);
        assert_eq!(engine.byte_array(&bytes), Some(&[0x61u8, 0x62][..]));
    }

    #[test]
    fn resolver_settles_its_promise_once() {
        let mut engine = StubEngine::default();
        let resolver = engine.new_resolver();
        let promise = engine.resolver_promise(resolver);
        assert_eq!(engine.promise_state(&promise), Some(PromiseState::Pending));

        engine.resolve(resolver, ScriptValue::Int(1));
        engine.resolve(resolver, ScriptValue::Int(2));
        assert_eq!(
            engine.promise_state(&promise),
            Some(PromiseState::Fulfilled(ScriptValue::Int(1)))
        );
    }

    #[test]
    fn rejection_without_handler_emits_event() {
        let mut engine = StubEngine::default();
        let resolver = engine.new_resolver();
        engine.reject(resolver, ScriptValue::String("boom".into()));
        let events = engine.drain_rejection_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], RejectionEvent::Unhandled { .. }));
    }

    #[test]
    fn late_handler_emits_retraction() {
        let mut engine = StubEngine::default();
        let resolver = engine.new_resolver();
        let promise = engine.resolver_promise(resolver);
        engine.reject(resolver, ScriptValue::Int(0));
        engine.attach_rejection_handler(&promise);
        let events = engine.drain_rejection_events();
        assert!(matches!(events[1], RejectionEvent::HandlerAdded { .. }));
    }

    #[test]
    fn native_functions_are_callable() {
        let mut engine = StubEngine::default();
        let f = engine.new_function(Box::new(|_engine, args| {
            Ok(args.into_iter().next().unwrap_or(ScriptValue::Undefined))
        }));
        let out = engine.call(&f, vec![ScriptValue::Int(7)]).unwrap();
        assert_eq!(out, ScriptValue::Int(7));
    }

    #[test]
    fn microtasks_drain_to_fixed_point() {
        let mut engine = StubEngine::default();
        engine.enqueue_microtask(Box::new(|e| {
            e.enqueue_microtask(Box::new(|e2| {
                let obj = e2.new_object();
                e2.set_property(&obj, "done", ScriptValue::Boolean(true));
            }));
        }));
        engine.run_microtasks();
        assert!(!engine.has_pending_microtasks());
    }

    #[test]
    fn automatic_policy_drains_microtasks_after_the_outermost_call() {
        let mut engine = StubEngine::default();
        let f = engine.new_function(Box::new(|engine, _args| {
            engine.enqueue_microtask(Box::new(|_| {}));
            Ok(ScriptValue::Undefined)
        }));
        engine.call(&f, Vec::new()).unwrap();
        assert!(!engine.has_pending_microtasks());
    }

    #[test]
    fn explicit_policy_waits_for_the_embedder() {
        let mut engine = StubEngine::new(EngineConfig {
            auto_microtasks: false,
            ..EngineConfig::default()
        });
        let f = engine.new_function(Box::new(|engine, _args| {
            engine.enqueue_microtask(Box::new(|_| {}));
            Ok(ScriptValue::Undefined)
        }));
        engine.call(&f, Vec::new()).unwrap();
        assert!(engine.has_pending_microtasks());

        engine.run_microtasks();
        assert!(!engine.has_pending_microtasks());
    }

    #[test]
    fn exception_stacks_clamp_to_the_configured_depth() {
        let mut engine = StubEngine::new(EngineConfig {
            stack_trace_limit: 3,
            ..EngineConfig::default()
        });
        let f = engine.new_function(Box::new(|_engine, _args| {
            let mut exception = JsException::new(ExceptionKind::TypeError, "deep failure");
            for line in 0u32..8 {
                exception.stack.push(StackFrame {
                    function_name: None,
                    source: Some("/app/deep.js".to_string()),
                    line: line + 1,
                    column: 1,
                });
            }
            Err(exception)
        }));
        let err = engine.call(&f, Vec::new()).unwrap_err();
        assert_eq!(err.stack.len(), 3);
        assert_eq!(err.stack[0].line, 1);
    }

    #[test]
    fn module_compile_records_imports_and_exports() {
        let mut engine = StubEngine::default();
        let id = engine
            .compile_module(
                "/app/main.js",
                "import { helper } from \"./util.js\";\nexport const answer = 42;\n",
            )
            .unwrap();
        let mut resolver = |engine: &mut dyn Engine, _referrer: ScriptId, spec: &str| {
            assert_eq!(spec, "./util.js");
            engine.compile_module("/app/util.js", "export const helper = 'hi';\n")
        };
        engine.instantiate_module(id, &mut resolver).unwrap();
        engine.evaluate_module(id).unwrap();
        let ns = engine.module_namespace(id).unwrap();
        assert_eq!(
            engine.get_property(&ns, "answer"),
            Some(ScriptValue::Int(42))
        );
    }

    #[test]
    fn bigint_export_literals_parse() {
        let mut engine = StubEngine::default();
        let id = engine
            .compile_module("/app/ids.js", "export const big = 18446744073709551615n;\n")
            .unwrap();
        engine.instantiate_module(id, &mut |_, _, _| unreachable!()).unwrap();
        engine.evaluate_module(id).unwrap();
        let ns = engine.module_namespace(id).unwrap();
        assert_eq!(
            engine.get_property(&ns, "big"),
            Some(ScriptValue::BigInt(num_bigint::BigInt::from(u64::MAX)))
        );
    }

    #[test]
    fn parse_directive_fails_compilation() {
        let mut engine = StubEngine::default();
        let err = engine
            .compile_module("/app/bad.js", "// @fail: parse\n")
            .unwrap_err();
        assert_eq!(err.kind, ExceptionKind::SyntaxError);
        assert_eq!(err.stack[0].source.as_deref(), Some("/app/bad.js"));
    }

    #[test]
    fn evaluate_directive_produces_stack_string() {
        let mut engine = StubEngine::default();
        let id = engine
            .compile_module("/app/boom.js", "// @fail: evaluate it broke\n")
            .unwrap();
        engine
            .instantiate_module(id, &mut |_, _, _| {
                Err(JsException::new(ExceptionKind::InternalError, "no imports"))
            })
            .unwrap();
        let err = engine.evaluate_module(id).unwrap_err();
        assert!(err.contains("it broke"));
        assert!(err.contains("/app/boom.js"));
    }

    #[test]
    fn collection_fires_finalizers_for_unpinned_wrappers() {
        let mut engine = StubEngine::default();
        let kept = engine.new_object();
        let dropped = engine.new_object();
        engine.set_finalizer(&kept, FinalizerPayload::Resource(1));
        engine.set_finalizer(&dropped, FinalizerPayload::Resource(2));
        engine.make_persistent(&kept);

        engine.collect_garbage();
        let finalized = engine.take_finalized();
        assert_eq!(finalized, vec![FinalizerPayload::Resource(2)]);

        engine.release_persistent(&kept);
        engine.collect_garbage();
        assert_eq!(engine.take_finalized(), vec![FinalizerPayload::Resource(1)]);
    }
}
