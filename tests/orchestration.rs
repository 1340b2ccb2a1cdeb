mod common;

use cloudqa::{NO_PLAN_MESSAGE, Source};
use common::{Fixture, ScriptedLlm};

const ORDERS_DESCRIPTION: &str = "Orders with customer ids and order totals";
const CUSTOMERS_DESCRIPTION: &str = "Customer ids mapped to customer names";

const TWO_STEP_PLAN: &str = r#"Here is the plan:
```json
{"steps": [
  {"dataset": "sales/orders.csv", "cloud": "s3", "sub_question": "Which customer ids have orders over 100?"},
  {"dataset": "crm.blob/customers.csv", "cloud": "azure", "sub_question": "What are the names of those customers?"}
]}
```"#;

#[test]
fn question_spanning_two_sources_is_planned_executed_and_merged() {
    let fixture = Fixture::remote();
    let llm = ScriptedLlm::new(&[
        ORDERS_DESCRIPTION,
        CUSTOMERS_DESCRIPTION,
        TWO_STEP_PLAN,
        "DESCRIPTIONS\nsales/orders.csv: One row per order with customer_id and total\n\n\
         SELECTED_FILES\nsales/orders.csv\n\nANSWER\nCustomers 10 and 12 have orders over 100.",
        "DESCRIPTIONS\ncrm.blob/customers.csv: (empty)\n\nSELECTED_FILES\ncrm.blob/customers.csv\n\n\
         ANSWER\nCustomer 10 is Ada. Customer 12 is not listed.",
        "Ada placed an order of 150.00 [s3][azure].\n\nData Gap: customer 12 missing from [azure]\n\n\
         **Executive Takeaway: Ada is the big spender.**",
    ]);
    let orchestrator = fixture.orchestrator(llm.clone());

    let report = orchestrator
        .run("Which customers placed orders over 100?")
        .unwrap();

    assert_eq!(report.plan.len(), 2);
    assert_eq!(report.results.len(), 2);
    assert!(report.answer.starts_with("Ada placed an order of 150.00"));
    assert!(report.answer.contains("Data Gap: customer 12 missing from [azure]"));
    assert_eq!(llm.call_count(), 6);

    let prompts = llm.prompts();
    // Planner sees every dataset with its seeded description and schema.
    assert!(prompts[2].contains("sales/orders.csv"));
    assert!(prompts[2].contains("crm.blob/customers.csv"));
    assert!(prompts[2].contains(ORDERS_DESCRIPTION));
    assert!(prompts[2].contains("customer_id"));
    // The second step carries the first step's answer ahead of its own question.
    let threaded = &prompts[4];
    let prior = threaded.find("Customers 10 and 12 have orders over 100.").unwrap();
    let own = threaded.find("What are the names of those customers?").unwrap();
    assert!(prior < own);
    // The merge sees both fragments tagged by source, and is told to flag
    // the customer that only one source knows about.
    assert!(prompts[5].contains("From [s3]:   Customers 10 and 12 have orders over 100."));
    assert!(prompts[5].contains("From [azure]:   Customer 10 is Ada. Customer 12 is not listed."));
    assert!(prompts[5].contains("Data Gap: <item> missing from [cloud]"));

    // The model's improved description was written back; "(empty)" was not.
    let orders = fixture.metadata.get("sales/orders.csv", Source::S3).unwrap();
    assert_eq!(orders.description, "One row per order with customer_id and total");
    let customers = fixture
        .metadata
        .get("crm.blob/customers.csv", Source::Azure)
        .unwrap();
    assert_eq!(customers.description, CUSTOMERS_DESCRIPTION);
}

#[test]
fn single_step_answer_is_returned_without_merge() {
    let fixture = Fixture::remote();
    let llm = ScriptedLlm::new(&[
        ORDERS_DESCRIPTION,
        CUSTOMERS_DESCRIPTION,
        r#"{"steps": [{"dataset": "sales/orders.csv", "cloud": "s3", "sub_question": "How many orders are there?"}]}"#,
        "ANSWER\nThere are 4 orders.",
    ]);
    let orchestrator = fixture.orchestrator(llm.clone());

    assert_eq!(orchestrator.answer("How many orders?"), "There are 4 orders.");
    assert_eq!(llm.call_count(), 4);
}

#[test]
fn empty_plan_returns_fixed_message_without_running_steps() {
    let fixture = Fixture::remote();
    let llm = ScriptedLlm::new(&[ORDERS_DESCRIPTION, CUSTOMERS_DESCRIPTION, r#"{"steps": []}"#]);
    let orchestrator = fixture.orchestrator(llm.clone());

    assert_eq!(orchestrator.answer("What is the weather?"), NO_PLAN_MESSAGE);
    assert_eq!(llm.call_count(), 3);
}

#[test]
fn plan_naming_unlisted_dataset_is_rejected() {
    let fixture = Fixture::remote();
    let bad = r#"{"steps": [{"dataset": "sales/secret.csv", "cloud": "s3", "sub_question": "x"}]}"#;
    let llm = ScriptedLlm::new(&[ORDERS_DESCRIPTION, CUSTOMERS_DESCRIPTION, bad, bad]);
    let orchestrator = fixture.orchestrator(llm.clone());

    assert_eq!(orchestrator.answer("Show me secrets"), NO_PLAN_MESSAGE);
    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 4);
    assert!(prompts[3].contains("Your previous reply was rejected"));
}

#[test]
fn step_with_wrong_cloud_is_routed_to_the_owning_source() {
    let fixture = Fixture::remote();
    let llm = ScriptedLlm::new(&[
        ORDERS_DESCRIPTION,
        CUSTOMERS_DESCRIPTION,
        r#"{"steps": [{"dataset": "crm.blob/customers.csv", "cloud": "s3", "sub_question": "List names"}]}"#,
        "ANSWER\nAda, Grace",
    ]);
    let orchestrator = fixture.orchestrator(llm.clone());

    let report = orchestrator.run("List customer names").unwrap();
    assert_eq!(report.results[0].source, Some(Source::Azure));
    assert_eq!(report.answer, "Ada, Grace");
    assert!(llm.prompts()[3].contains("Cloud: AZURE"));
}
