use lims::{
    CallKind, InMemoryLimsClient, ItemEvent, ItemStatus, ItemUpdate, ItemsPatch, LimsClient, LimsError, OrderEvent,
    OrderPatch, OrderStatus, Resource, ResourceKind, Role, SearchCriteria,
};

fn by_barcode(values: &[&str]) -> SearchCriteria {
    SearchCriteria::ItemsByBarcode { position: "barcode".into(),
                                     barcode_type: "sanger-barcode".into(),
                                     values: values.iter().map(|v| v.to_string()).collect() }
}

#[test]
fn resolve_follows_requested_barcode_order() -> Result<(), LimsError> {
    let client = InMemoryLimsClient::new();
    let ids = client.seed_tubes(&["A", "B", "C"])?;

    let search = client.search(&by_barcode(&["C", "A", "B"]))?;
    let found: Vec<_> = client.resolve(&search)?
                              .into_iter()
                              .filter_map(|r| match r {
                                  Resource::Item(rec) => Some(rec.id),
                                  Resource::Order(_) => None,
                              })
                              .collect();
    assert_eq!(found, vec![ids[2], ids[0], ids[1]]);
    Ok(())
}

#[test]
fn unknown_barcodes_are_skipped() -> Result<(), LimsError> {
    let client = InMemoryLimsClient::new();
    client.seed_tubes(&["A"])?;
    let search = client.search(&by_barcode(&["A", "missing"]))?;
    assert_eq!(client.resolve(&search)?.len(), 1);
    Ok(())
}

#[test]
fn order_search_matches_role() -> Result<(), LimsError> {
    let client = InMemoryLimsClient::new();
    let (order, tubes) = client.seed_extraction_order(&["T1", "T2"])?;

    let hit = client.search(&SearchCriteria::OrderByItem { item: tubes[1], role: Role::TubeToBeExtracted })?;
    let resolved = client.resolve(&hit)?;
    assert!(matches!(resolved.as_slice(), [Resource::Order(o)] if o.id == order));

    let miss = client.search(&SearchCriteria::OrderByItem { item: tubes[1], role: Role::ExtractedTube })?;
    assert!(client.resolve(&miss)?.is_empty());
    Ok(())
}

#[test]
fn order_lifecycle_and_item_events() -> Result<(), LimsError> {
    let client = InMemoryLimsClient::new();
    let (order, tubes) = client.seed_extraction_order(&["L1"])?;

    // `start` sobre un borrador no es válido
    let err = client.update(&order, &OrderPatch::from(OrderEvent::Start)).unwrap_err();
    assert!(matches!(err, LimsError::InvalidTransition(_)));

    client.update(&order, &OrderPatch::from(OrderEvent::Build))?;
    let o = client.update(&order, &OrderPatch::from(OrderEvent::Start))?;
    assert_eq!(o.status, OrderStatus::InProgress);

    let column = lims::ItemId(client.create(ResourceKind::SpinColumn)?);
    let patch = ItemsPatch::new().with_role(Role::BindingSpinColumnDna, &[column], ItemUpdate::event(ItemEvent::Start))
                                 .with_role(Role::TubeToBeExtracted, &tubes, ItemUpdate::event(ItemEvent::Unuse));
    let o = client.update(&order, &OrderPatch::Items(patch))?;
    assert_eq!(o.items_under(Role::BindingSpinColumnDna)[0].status, ItemStatus::Started);
    assert_eq!(o.items_under(Role::TubeToBeExtracted)[0].status, ItemStatus::Unused);

    assert_eq!(client.count(CallKind::Update), 3);
    Ok(())
}
