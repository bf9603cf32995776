//! A small shopping list: a header model, a product collection and a watcher
//! that keeps each line total in sync with its amount.
//!
//! Run with `RUST_LOG=tripled=debug` to see what the engine does.

use tracing_subscriber::EnvFilter;
use tripled::{bootstrap, properties, teardown, with_engine, BindingConfig};

const PAGE: &str = r#"<main>
    <h1 td-model="page"><span td-property="title">Products</span></h1>
    <table data-td-collection="product">
        <tr td-template="">
            <td td-property="name"/>
            <td td-property="price"/>
            <td><input name="amount[{{ref}}]" td-property="amount"/></td>
            <td td-property="total"/>
        </tr>
        <tr td-model="tea">
            <td td-property="name">Green tea</td>
            <td td-property="price">3.95</td>
            <td><input name="amount[tea]" td-property="amount">1</input></td>
            <td td-property="total">3,95</td>
        </tr>
    </table>
</main>"#;

/// Two decimals with a decimal comma, as on a Dutch price tag.
fn euro(value: f64) -> String {
    format!("{value:.2}").replace('.', ",")
}

fn main() -> tripled::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    bootstrap(PAGE, BindingConfig::default())?;

    with_engine(|engine| {
        engine.watch("product", "amount", |value, model| {
            let amount: f64 = value.trim().parse().unwrap_or(0.0);
            let price: f64 = model
                .get("price")
                .and_then(|price| price.parse().ok())
                .unwrap_or(0.0);
            model.set("total", euro(amount * price));
            value.to_string()
        });

        engine.update_at("page", ("title", "Shopping list"));
        engine.collection("product").and_then(|q| {
            q.insert(
                "coffee",
                properties([("name", "Coffee beans"), ("price", "7.50"), ("amount", "0")]),
            )
        });
        engine.update_at("product.coffee", ("amount", "2"));
        engine.update_at("product.tea", ("amount", "3"));

        println!("{}", engine.document().to_markup());
        for (reference, model) in engine.collection_record("product").into_iter().flat_map(|c| c.models()) {
            println!("{reference}: {:?}", model.properties());
        }
    })?;

    teardown();
    Ok(())
}
