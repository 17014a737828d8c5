use treesync_benches::available_corpora;
use treesync_core::patch_store;

#[test]
fn wide_mapping_corpus_patches_the_store() -> Result<(), Box<dyn std::error::Error>> {
    let corpus = available_corpora()
        .into_iter()
        .find(|corpus| corpus.name() == "wide-mapping")
        .expect("registered corpus");
    let changes = corpus.changes()?;
    assert_eq!(changes.len(), 510);
    println!("{}", changes.render());

    let store = corpus.store();
    let stats = patch_store(&store, corpus.after())?;
    assert_eq!(stats.updated, 50);
    assert_eq!((stats.added, stats.deleted), (10, 10));
    Ok(())
}
