mod common;

use common::{capture_logs, settings, RecordingRegistry, SequenceResolver};
use regkit::{
    DeregistrationCoordinator, DeregistrationError, DescriptorError, DiscoverySettings,
    FixedAddressResolver, InMemoryRegistry, InstanceDescriptor, LifecycleEvent, LifecycleListener, ListenerHandle,
    OperationKind, RegistrationCoordinator, RegistrationError, RegistryClient, RegistryFailure,
    PROVENANCE_KEY, PROVENANCE_SOURCE,
};
use std::error::Error as _;
use std::sync::Arc;

fn registration(
    enabled: bool,
    template: InstanceDescriptor,
    registry: Arc<dyn RegistryClient>,
) -> RegistrationCoordinator {
    RegistrationCoordinator::new(
        settings(enabled, template, "orders-api"),
        registry,
        Arc::new(FixedAddressResolver::new("10.0.0.7")),
    )
}

fn deregistration(
    enabled: bool,
    template: InstanceDescriptor,
    registry: Arc<dyn RegistryClient>,
    port: u16,
) -> DeregistrationCoordinator {
    let handle = ListenerHandle::new();
    handle.set_port(port);
    DeregistrationCoordinator::new(
        settings(enabled, template, "orders-api"),
        registry,
        Arc::new(FixedAddressResolver::new("10.0.0.7")),
        Arc::new(handle),
    )
}

#[tokio::test]
async fn startup_scenario_registers_with_defaults() {
    let registry = RecordingRegistry::new();
    let coordinator = registration(true, InstanceDescriptor::default(), registry.clone());

    let registered = coordinator.register(8080).await.unwrap().unwrap();

    let calls = registry.calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.op, OperationKind::Register);
    assert_eq!(call.service, "orders-api");
    assert_eq!(call.group, "DEFAULT_GROUP");
    assert_eq!(call.instance.ip, "10.0.0.7");
    assert_eq!(call.instance.port, 8080);
    assert_eq!(call.instance.metadata[PROVENANCE_KEY], PROVENANCE_SOURCE);
    assert_eq!(call.instance.instance_id, "");
    assert_eq!(registered, call.instance);
}

#[tokio::test]
async fn disabled_makes_no_registry_calls() {
    let registry = RecordingRegistry::new();
    let reg = registration(false, InstanceDescriptor::default(), registry.clone());
    let dereg = deregistration(false, InstanceDescriptor::default(), registry.clone(), 8080);

    assert!(reg.register(8080).await.unwrap().is_none());
    assert!(dereg.deregister().await.unwrap().is_none());

    // through the listener interface too
    reg.on_event(&LifecycleEvent::ListenerReady { port: 8080 })
        .await
        .unwrap();
    dereg.on_event(&LifecycleEvent::ContextClosing).await.unwrap();

    assert!(registry.calls().is_empty());
}

#[tokio::test]
async fn disabled_ignores_fully_specified_descriptor() {
    let template = InstanceDescriptor::default()
        .with_service_name("billing")
        .with_group("PAYMENTS")
        .with_address("192.168.1.5", 9000);
    let settings = Arc::new(DiscoverySettings::new(false, template, "").unwrap());
    let registry = RecordingRegistry::new();

    let reg = RegistrationCoordinator::new(
        settings.clone(),
        registry.clone(),
        Arc::new(FixedAddressResolver::new("10.0.0.7")),
    );
    let handle = ListenerHandle::new();
    handle.set_port(9000);
    let dereg = DeregistrationCoordinator::new(
        settings,
        registry.clone(),
        Arc::new(FixedAddressResolver::new("10.0.0.7")),
        Arc::new(handle),
    );

    assert!(reg.register(9000).await.unwrap().is_none());
    assert!(dereg.deregister().await.unwrap().is_none());
    assert!(registry.calls().is_empty());
}

#[tokio::test]
async fn unset_address_comes_from_resolver_at_call_time() {
    let registry = RecordingRegistry::new();
    let template = InstanceDescriptor::default();
    let resolver = Arc::new(SequenceResolver::default());
    let handle = ListenerHandle::new();
    handle.set_port(8080);

    let reg = RegistrationCoordinator::new(
        settings(true, template.clone(), "orders-api"),
        registry.clone(),
        resolver.clone(),
    );
    let dereg = DeregistrationCoordinator::new(
        settings(true, template, "orders-api"),
        registry.clone(),
        resolver,
        Arc::new(handle),
    );

    reg.register(8080).await.unwrap();
    dereg.deregister().await.unwrap();

    let calls = registry.calls();
    assert_eq!(calls[0].instance.ip, "10.0.0.1");
    // looked up again at shutdown, not remembered
    assert_eq!(calls[1].instance.ip, "10.0.0.2");
}

#[tokio::test]
async fn registration_port_comes_from_event_not_listener() {
    let registry = RecordingRegistry::new();
    let reg = registration(true, InstanceDescriptor::default(), registry.clone());

    reg.on_event(&LifecycleEvent::ListenerReady { port: 8080 })
        .await
        .unwrap();

    assert_eq!(registry.calls()[0].instance.port, 8080);
}

#[tokio::test]
async fn configured_port_is_kept() {
    let registry = RecordingRegistry::new();
    let template = InstanceDescriptor::default().with_address("", 9000);
    let reg = registration(true, template.clone(), registry.clone());
    let dereg = deregistration(true, template, registry.clone(), 8080);

    reg.register(8080).await.unwrap();
    dereg.deregister().await.unwrap();

    let ports: Vec<u16> = registry.calls().iter().map(|c| c.instance.port).collect();
    assert_eq!(ports, vec![9000, 9000]);
}

#[tokio::test]
async fn deregistration_uses_current_listener_port_even_after_change() {
    let registry = Arc::new(InMemoryRegistry::new());
    let handle = ListenerHandle::new();
    let template = InstanceDescriptor::default();

    let reg = RegistrationCoordinator::new(
        settings(true, template.clone(), "orders-api"),
        registry.clone(),
        Arc::new(FixedAddressResolver::new("10.0.0.7")),
    );
    let dereg = DeregistrationCoordinator::new(
        settings(true, template, "orders-api"),
        registry.clone(),
        Arc::new(FixedAddressResolver::new("10.0.0.7")),
        Arc::new(handle.clone()),
    );

    handle.set_port(8080);
    reg.register(8080).await.unwrap();

    // listener rebound before shutdown
    handle.set_port(9090);
    let removed = dereg.deregister().await.unwrap().unwrap();

    assert_eq!(removed.port, 9090);
    // the 8080 registration is left behind in the registry
    let left = registry.instances("orders-api", "DEFAULT_GROUP");
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].port, 8080);
}

#[tokio::test]
async fn explicit_service_name_is_used_verbatim() {
    let registry = RecordingRegistry::new();
    let template = InstanceDescriptor::default()
        .with_service_name("Billing-API")
        .with_group("PAYMENTS");
    let reg = registration(true, template.clone(), registry.clone());
    let dereg = deregistration(true, template, registry.clone(), 8080);

    reg.register(8080).await.unwrap();
    dereg.deregister().await.unwrap();

    for call in registry.calls() {
        assert_eq!(call.service, "Billing-API");
        assert_eq!(call.group, "PAYMENTS");
        assert_eq!(call.instance.service_name, "Billing-API");
    }
}

#[tokio::test]
async fn empty_service_name_falls_back_to_application_name() {
    let registry = RecordingRegistry::new();
    let dereg = deregistration(true, InstanceDescriptor::default(), registry.clone(), 8080);

    dereg.deregister().await.unwrap();

    assert_eq!(registry.calls()[0].service, "orders-api");
}

#[tokio::test]
async fn add_failure_is_wrapped_and_not_logged_as_success() {
    let (logs, _guard) = capture_logs();
    let registry = RecordingRegistry::failing_add();
    let reg = registration(true, InstanceDescriptor::default(), registry.clone());

    let err = reg.register(8080).await.unwrap_err();

    assert_eq!(err.operation(), OperationKind::Register);
    match &err {
        RegistrationError::Registry {
            service, group, source,
        } => {
            assert_eq!(service, "orders-api");
            assert_eq!(group, "DEFAULT_GROUP");
            assert!(matches!(source, RegistryFailure::Rejected { code: 500, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.source().unwrap().to_string().contains("add refused"));
    assert_eq!(registry.calls().len(), 1);
    assert!(!logs.contents().contains("Finished auto register service"));
}

#[tokio::test]
async fn remove_failure_is_wrapped_and_not_logged_as_success() {
    let (logs, _guard) = capture_logs();
    let registry = RecordingRegistry::failing_remove();
    let dereg = deregistration(true, InstanceDescriptor::default(), registry.clone(), 8080);

    let err = dereg.deregister().await.unwrap_err();

    assert_eq!(err.operation(), OperationKind::Deregister);
    assert!(matches!(
        err,
        DeregistrationError::Registry {
            source: RegistryFailure::Unavailable(_),
            ..
        }
    ));
    assert!(!logs.contents().contains("Finished auto deregister service"));
}

#[tokio::test]
async fn success_is_logged_with_fields() {
    let (logs, _guard) = capture_logs();
    let registry = RecordingRegistry::new();
    registration(true, InstanceDescriptor::default(), registry.clone())
        .register(8080)
        .await
        .unwrap();
    deregistration(true, InstanceDescriptor::default(), registry, 8080)
        .deregister()
        .await
        .unwrap();

    let out = logs.contents();
    assert!(out.contains("Finished auto register service"), "{out}");
    assert!(out.contains("Finished auto deregister service"), "{out}");
    assert!(out.contains("orders-api"), "{out}");
    assert!(out.contains("10.0.0.7"), "{out}");
    assert!(out.contains("port=8080"), "{out}");
}

#[tokio::test]
async fn zero_port_is_rejected_before_any_call() {
    let registry = RecordingRegistry::new();
    let reg = registration(true, InstanceDescriptor::default(), registry.clone());
    // listener never bound
    let dereg = deregistration(true, InstanceDescriptor::default(), registry.clone(), 0);

    let err = reg.register(0).await.unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::InvalidDescriptor {
            reason: DescriptorError::ZeroPort,
            ..
        }
    ));
    let err = dereg.deregister().await.unwrap_err();
    assert!(matches!(
        err,
        DeregistrationError::InvalidDescriptor {
            reason: DescriptorError::ZeroPort,
            ..
        }
    ));
    assert!(registry.calls().is_empty());
}

#[tokio::test]
async fn coordinators_ignore_the_other_event() {
    let registry = RecordingRegistry::new();
    let reg = registration(true, InstanceDescriptor::default(), registry.clone());
    let dereg = deregistration(true, InstanceDescriptor::default(), registry.clone(), 8080);

    reg.on_event(&LifecycleEvent::ContextClosing).await.unwrap();
    dereg
        .on_event(&LifecycleEvent::ListenerReady { port: 8080 })
        .await
        .unwrap();

    assert!(registry.calls().is_empty());
}
